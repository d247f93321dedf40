use crate::models::*;
use crate::services::RewardService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/rewards",
    tag = "rewards",
    responses(
        (status = 200, description = "获取奖项列表成功", body = [Reward])
    )
)]
/// 奖项列表（按创建顺序，来自缓存）
pub async fn list_rewards(service: web::Data<RewardService>) -> Result<HttpResponse> {
    let rewards = service.list().await;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": rewards })))
}

#[utoipa::path(
    post,
    path = "/rewards",
    tag = "rewards",
    request_body = CreateRewardRequest,
    responses(
        (status = 201, description = "创建奖项成功", body = Reward),
        (status = 400, description = "参数错误")
    )
)]
/// 新建奖项：剩余名额 = 总名额，中奖名单为空
pub async fn create_reward(
    service: web::Data<RewardService>,
    req: web::Json<CreateRewardRequest>,
) -> Result<HttpResponse> {
    match service.create(req.into_inner()).await {
        Ok(reward) => Ok(HttpResponse::Created().json(json!({ "success": true, "data": reward }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/rewards/summary",
    tag = "rewards",
    responses(
        (status = 200, description = "获取奖项统计成功", body = RewardSummary)
    )
)]
pub async fn get_summary(service: web::Data<RewardService>) -> Result<HttpResponse> {
    let summary = service.summary().await;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": summary })))
}

#[utoipa::path(
    put,
    path = "/rewards/{id}",
    tag = "rewards",
    params(
        ("id" = String, Path, description = "奖项ID")
    ),
    request_body = UpdateRewardRequest,
    responses(
        (status = 200, description = "更新奖项成功", body = Reward),
        (status = 400, description = "参数错误"),
        (status = 404, description = "奖项不存在"),
        (status = 500, description = "保存失败，已回滚")
    )
)]
/// 编辑奖项：修改总名额后剩余名额按 max(0, 总名额 - 中奖人数) 重新计算
pub async fn update_reward(
    service: web::Data<RewardService>,
    path: web::Path<String>,
    req: web::Json<UpdateRewardRequest>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    match service.edit(&id, req.into_inner()).await {
        Ok(reward) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": reward }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/rewards/{id}",
    tag = "rewards",
    params(
        ("id" = String, Path, description = "奖项ID")
    ),
    responses(
        (status = 200, description = "删除奖项成功"),
        (status = 404, description = "奖项不存在")
    )
)]
pub async fn delete_reward(
    service: web::Data<RewardService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    match service.delete(&id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Reward deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn reward_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rewards")
            .route("", web::get().to(list_rewards))
            .route("", web::post().to(create_reward))
            .route("/summary", web::get().to(get_summary))
            .route("/{id}", web::put().to(update_reward))
            .route("/{id}", web::delete().to(delete_reward)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RewardCache;
    use crate::services::reward_store::memory::MemoryRewardStore;
    use actix_web::{App, http::StatusCode, test};
    use std::sync::Arc;

    fn service() -> RewardService {
        RewardService::new(Arc::new(MemoryRewardStore::default()), RewardCache::new())
    }

    #[actix_web::test]
    async fn test_create_then_edit_over_http() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service()))
                .service(web::scope("/api/v1").configure(reward_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/rewards")
            .set_json(json!({ "name": "TV", "image": "/rewards/tv.png", "totalQuantity": 2 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["remainingQuantity"], 2);

        let req = test::TestRequest::put()
            .uri(&format!("/api/v1/rewards/{id}"))
            .set_json(json!({ "totalQuantity": 5 }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["remainingQuantity"], 5);

        let req = test::TestRequest::get()
            .uri("/api/v1/rewards/summary")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["rewardCount"], 1);
    }

    #[actix_web::test]
    async fn test_invalid_reward_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service()))
                .configure(reward_config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/rewards")
            .set_json(json!({ "name": "TV", "image": "/rewards/tv.png", "totalQuantity": 0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::delete().uri("/rewards/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

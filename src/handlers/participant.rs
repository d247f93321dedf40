use crate::services::ParticipantService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/participants",
    tag = "participants",
    responses(
        (status = 200, description = "获取名单成功", body = ParticipantListResponse)
    )
)]
pub async fn list_participants(service: web::Data<ParticipantService>) -> Result<HttpResponse> {
    let list = service.list().await;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list })))
}

#[utoipa::path(
    delete,
    path = "/participants",
    tag = "participants",
    responses(
        (status = 200, description = "清空名单成功")
    )
)]
/// 清空名单（已有中奖记录不受影响）
pub async fn clear_participants(service: web::Data<ParticipantService>) -> Result<HttpResponse> {
    match service.clear().await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Participants cleared"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn participant_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/participants")
            .route("", web::get().to(list_participants))
            .route("", web::delete().to(clear_participants)),
    );
}

use crate::models::*;
use crate::services::SettingsService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    responses(
        (status = 200, description = "获取设置成功", body = SettingsResponse)
    )
)]
/// 获取设置（未设置的字段返回默认值）
pub async fn get_settings(service: web::Data<SettingsService>) -> Result<HttpResponse> {
    match service.get().await {
        Ok(settings) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": settings }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/settings",
    tag = "settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "保存设置成功", body = SettingsResponse),
        (status = 400, description = "参数错误")
    )
)]
/// 保存设置：只合并请求中提供的字段
pub async fn update_settings(
    service: web::Data<SettingsService>,
    req: web::Json<UpdateSettingsRequest>,
) -> Result<HttpResponse> {
    match service.set(req.into_inner()).await {
        Ok(settings) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": settings }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn settings_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/settings")
            .route("", web::get().to(get_settings))
            .route("", web::post().to(update_settings)),
    );
}

use crate::error::AppError;
use crate::models::*;
use crate::services::{DrawEngine, SettingsService};
use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{HttpResponse, ResponseError, Result, web};
use futures_util::{StreamExt, stream};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

#[utoipa::path(
    post,
    path = "/draw/{reward_id}",
    tag = "draw",
    params(
        ("reward_id" = String, Path, description = "奖项ID"),
        ("wait" = Option<bool>, Query, description = "为 true 时等待抽奖结束并返回结果")
    ),
    responses(
        (status = 200, description = "抽奖完成（wait=true）或未开始（返回跳过原因）", body = DrawReport),
        (status = 202, description = "已在后台开始抽奖", body = DrawPlan),
        (status = 404, description = "奖项不存在"),
        (status = 500, description = "保存中奖者失败，序列已中止"),
        (status = 503, description = "抽奖舞台不可用")
    )
)]
/// 按设置中的模式抽奖：
/// - one-by-one：抽出一名
/// - all-at-once：依次抽到名额或可抽名单用完为止
pub async fn draw(
    engine: web::Data<DrawEngine>,
    settings_service: web::Data<SettingsService>,
    path: web::Path<String>,
    query: web::Query<DrawQuery>,
) -> Result<HttpResponse> {
    let reward_id = path.into_inner();
    let settings = match settings_service.get().await {
        Ok(settings) => settings.draw_settings(),
        Err(e) => return Ok(e.error_response()),
    };

    if query.wait.unwrap_or(false) {
        return match engine.draw(&reward_id, settings).await {
            Ok(report) => {
                if let Some(message) = report.persistence_failure() {
                    return Ok(AppError::PersistenceError(message.to_string()).error_response());
                }
                if report.stop == DrawStop::AnimatorUnavailable {
                    return Ok(AppError::AnimatorUnavailable.error_response());
                }
                Ok(HttpResponse::Ok().json(json!({ "success": true, "data": report })))
            }
            Err(e) => Ok(e.error_response()),
        };
    }

    match engine.start(&reward_id, settings).await {
        Ok(plan) if plan.declined.is_some() => {
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": plan })))
        }
        Ok(plan) => Ok(HttpResponse::Accepted().json(json!({ "success": true, "data": plan }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/draw/status",
    tag = "draw",
    responses(
        (status = 200, description = "当前抽奖状态", body = DrawStatusResponse)
    )
)]
pub async fn draw_status(engine: web::Data<DrawEngine>) -> Result<HttpResponse> {
    let status = engine.status().await;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": status })))
}

#[utoipa::path(
    get,
    path = "/draw/events",
    tag = "draw",
    responses(
        (status = 200, description = "抽奖事件流（server-sent events，data 为 DrawEvent）", content_type = "text/event-stream")
    )
)]
/// 展示屏订阅的事件流
pub async fn draw_events(engine: web::Data<DrawEngine>) -> HttpResponse {
    let rx = engine.events().subscribe();

    let events = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let frame = Bytes::from(event.to_sse_frame());
                    return Some((Ok::<_, actix_web::Error>(frame), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Draw event subscriber lagged, {skipped} events skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });
    let hello = stream::once(async {
        Ok::<_, actix_web::Error>(Bytes::from_static(b": connected\n\n"))
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(hello.chain(events))
}

/// 路由配置
pub fn draw_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/draw")
            .route("/status", web::get().to(draw_status))
            .route("/events", web::get().to(draw_events))
            .route("/{reward_id}", web::post().to(draw)),
    );
}

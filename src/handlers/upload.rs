use crate::config::StorageConfig;
use crate::error::AppError;
use crate::services::{MediaKind, ParticipantService, UploadService};
use crate::utils::read_file_field;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

/// multipart 中的文件字段名
const FILE_FIELD: &str = "file";

#[utoipa::path(
    post,
    path = "/upload/participants",
    tag = "upload",
    request_body(content = String, description = "multipart 字段 file：.xlsx / .xls / .csv，最大 5MB", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "导入名单成功", body = ParticipantImportResponse),
        (status = 400, description = "文件无效或没有名字")
    )
)]
/// 导入名单：读取第一张表的第一列并整体替换当前名单
pub async fn upload_participants(
    service: web::Data<ParticipantService>,
    storage: web::Data<StorageConfig>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let file = match read_file_field(&mut payload, FILE_FIELD, storage.max_participant_file_bytes)
        .await
    {
        Ok(file) => file,
        // 文件过大或缺失同样视为无效导入
        Err(AppError::ValidationError(msg)) => {
            return Ok(AppError::MalformedImport(msg).error_response());
        }
        Err(e) => return Ok(e.error_response()),
    };

    match service.import(file).await {
        Ok(resp) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": resp }))),
        Err(e) => Ok(e.error_response()),
    }
}

async fn save_media(
    kind: MediaKind,
    service: web::Data<UploadService>,
    storage: web::Data<StorageConfig>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let file = match read_file_field(&mut payload, FILE_FIELD, storage.max_media_file_bytes).await
    {
        Ok(file) => file,
        Err(e) => return Ok(e.error_response()),
    };

    match service.save(kind, file).await {
        Ok(resp) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": resp }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/upload/reward",
    tag = "upload",
    request_body(content = String, description = "multipart 字段 file：图片，最大 10MB", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "上传奖品图片成功", body = MediaUploadResponse),
        (status = 400, description = "文件类型或大小不符")
    )
)]
pub async fn upload_reward_image(
    service: web::Data<UploadService>,
    storage: web::Data<StorageConfig>,
    payload: Multipart,
) -> Result<HttpResponse> {
    save_media(MediaKind::RewardImage, service, storage, payload).await
}

#[utoipa::path(
    post,
    path = "/upload/background",
    tag = "upload",
    request_body(content = String, description = "multipart 字段 file：图片，最大 10MB", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "上传背景图片成功", body = MediaUploadResponse),
        (status = 400, description = "文件类型或大小不符")
    )
)]
pub async fn upload_background(
    service: web::Data<UploadService>,
    storage: web::Data<StorageConfig>,
    payload: Multipart,
) -> Result<HttpResponse> {
    save_media(MediaKind::Background, service, storage, payload).await
}

#[utoipa::path(
    post,
    path = "/upload/audio",
    tag = "upload",
    request_body(content = String, description = "multipart 字段 file：MP3 / WAV / OGG / AAC / WEBM / M4A，最大 10MB", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "上传中奖音效成功", body = MediaUploadResponse),
        (status = 400, description = "文件类型或大小不符")
    )
)]
/// 中奖音效
pub async fn upload_audio(
    service: web::Data<UploadService>,
    storage: web::Data<StorageConfig>,
    payload: Multipart,
) -> Result<HttpResponse> {
    save_media(MediaKind::Audio, service, storage, payload).await
}

/// 路由配置
pub fn upload_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/upload")
            .route("/participants", web::post().to(upload_participants))
            .route("/reward", web::post().to(upload_reward_image))
            .route("/background", web::post().to(upload_background))
            .route("/audio", web::post().to(upload_audio)),
    );
}

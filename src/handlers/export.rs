use crate::services::ExportService;
use actix_web::http::header;
use actix_web::{HttpResponse, ResponseError, Result, web};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[utoipa::path(
    get,
    path = "/export/winners",
    tag = "export",
    responses(
        (status = 200, description = "中奖名单 Excel 文件", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 404, description = "没有可导出的奖项")
    )
)]
/// 导出中奖名单：每个奖项一行，中奖者按顺序分列
pub async fn export_winners(service: web::Data<ExportService>) -> Result<HttpResponse> {
    match service.export_winners().await {
        Ok(export) => Ok(HttpResponse::Ok()
            .content_type(XLSX_CONTENT_TYPE)
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.file_name),
            ))
            .body(export.bytes)),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn export_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/export").route("/winners", web::get().to(export_winners)));
}

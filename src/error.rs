use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Malformed import: {0}")]
    MalformedImport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Persistence timed out after {0} ms")]
    PersistenceTimeout(u64),

    #[error("Reveal animator unavailable")]
    AnimatorUnavailable,

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AppError {
    /// 写入奖项失败（含超时），抽奖序列需要中止
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            AppError::PersistenceError(_)
                | AppError::PersistenceTimeout(_)
                | AppError::DatabaseError(_)
        )
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::MalformedImport(msg) => {
                log::warn!("Malformed import: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "MALFORMED_IMPORT",
                    msg.clone(),
                )
            }
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
            ),
            AppError::PersistenceError(msg) => {
                log::error!("Persistence error: {msg}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    msg.clone(),
                )
            }
            AppError::PersistenceTimeout(ms) => {
                log::error!("Persistence timed out after {ms} ms");
                (
                    actix_web::http::StatusCode::GATEWAY_TIMEOUT,
                    "PERSISTENCE_TIMEOUT",
                    format!("Saving the reward timed out after {ms} ms"),
                )
            }
            AppError::AnimatorUnavailable => {
                log::warn!("Reveal animator unavailable");
                (
                    actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                    "ANIMATOR_UNAVAILABLE",
                    "Drawing stage is unavailable".to_string(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}

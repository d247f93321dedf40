use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 错误响应中的 error 字段：{ "success": false, "error": { code, message } }
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    #[schema(example = "VALIDATION_ERROR")]
    pub code: String,
    pub message: String,
}

use serde::Serialize;
use utoipa::ToSchema;

/// 媒体文件上传结果
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaUploadResponse {
    /// 可直接访问的地址，例如 /rewards/reward-1729300000000.png
    pub url: String,
    pub file_name: String,
    pub file_size: usize,
    pub file_type: Option<String>,
}

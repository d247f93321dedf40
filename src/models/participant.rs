use serde::Serialize;
use utoipa::ToSchema;

/// 抽奖名单
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantListResponse {
    pub participants: Vec<String>,
    pub count: usize,
}

/// 名单导入结果
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantImportResponse {
    pub participants: Vec<String>,
    pub count: usize,
    pub file_name: String,
}

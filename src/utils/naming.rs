use chrono::Utc;

/// 生成上传文件名：<prefix>-<毫秒时间戳>.<ext>
pub fn timestamped_file_name(prefix: &str, ext: &str) -> String {
    format!("{prefix}-{}.{ext}", Utc::now().timestamp_millis())
}

/// 导出文件名中的时间戳，例如 2025-10-20T08-30-00
pub fn export_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string()
}

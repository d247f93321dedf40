use crate::error::{AppError, AppResult};
use actix_multipart::Multipart;
use futures_util::TryStreamExt;

/// 从 multipart 请求中读取到内存的文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// 小写扩展名（不含点）
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.file_name)
    }
}

pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

/// 读取名为 field_name 的文件字段，超过 max_bytes 立即拒绝
pub async fn read_file_field(
    payload: &mut Multipart,
    field_name: &str,
    max_bytes: usize,
) -> AppResult<UploadedFile> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::ValidationError(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        let content_type = field.content_type().map(|m| m.essence_str().to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::ValidationError(format!("Failed to read upload: {e}")))?
        {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(AppError::ValidationError(format!(
                    "File too large. Maximum size is {} MB",
                    max_bytes / (1024 * 1024)
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(AppError::ValidationError("Uploaded file is empty".to_string()));
        }

        return Ok(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(AppError::ValidationError("No file uploaded".to_string()))
}

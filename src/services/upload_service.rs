use crate::error::{AppError, AppResult};
use crate::models::MediaUploadResponse;
use crate::utils::{UploadedFile, timestamped_file_name};
use std::path::{Path, PathBuf};

const AUDIO_CONTENT_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/ogg",
    "audio/aac",
    "audio/webm",
];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "aac", "webm", "m4a"];

/// 可上传的媒体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    RewardImage,
    Background,
    Audio,
}

impl MediaKind {
    /// public 目录下的子目录，同时也是访问路径
    pub fn dir(&self) -> &'static str {
        match self {
            MediaKind::RewardImage => "rewards",
            MediaKind::Background => "backgrounds",
            MediaKind::Audio => "audio",
        }
    }

    pub fn file_prefix(&self) -> &'static str {
        match self {
            MediaKind::RewardImage => "reward",
            MediaKind::Background => "background",
            MediaKind::Audio => "winner-audio",
        }
    }

    fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::RewardImage | MediaKind::Background => "png",
            MediaKind::Audio => "mp3",
        }
    }

    /// 检查文件类型，返回保存用的扩展名
    pub fn accept(&self, file: &UploadedFile) -> AppResult<String> {
        let content_type = file.content_type.as_deref().unwrap_or_default();
        let ext = file.extension();

        match self {
            MediaKind::RewardImage | MediaKind::Background => {
                if !content_type.starts_with("image/") {
                    return Err(AppError::ValidationError(
                        "File must be an image".to_string(),
                    ));
                }
            }
            MediaKind::Audio => {
                let type_ok = AUDIO_CONTENT_TYPES.contains(&content_type);
                let ext_ok = ext
                    .as_deref()
                    .is_some_and(|e| AUDIO_EXTENSIONS.contains(&e));
                if !type_ok && !ext_ok {
                    return Err(AppError::ValidationError(
                        "Invalid file type. Please upload an audio file (MP3, WAV, OGG, AAC, WEBM, M4A)"
                            .to_string(),
                    ));
                }
            }
        }

        Ok(ext.unwrap_or_else(|| self.default_extension().to_string()))
    }
}

/// 保存上传的图片与音效到 public 目录
#[derive(Clone)]
pub struct UploadService {
    public_dir: PathBuf,
}

impl UploadService {
    pub fn new(public_dir: impl Into<PathBuf>) -> Self {
        Self {
            public_dir: public_dir.into(),
        }
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn media_dir(&self, kind: MediaKind) -> PathBuf {
        self.public_dir.join(kind.dir())
    }

    pub async fn save(&self, kind: MediaKind, file: UploadedFile) -> AppResult<MediaUploadResponse> {
        let ext = kind.accept(&file)?;
        let file_name = timestamped_file_name(kind.file_prefix(), &ext);

        let dir = self.media_dir(kind);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file_name), &file.bytes).await?;

        log::info!(
            "Saved {} upload {} ({} bytes)",
            kind.dir(),
            file_name,
            file.size()
        );
        Ok(MediaUploadResponse {
            url: format!("/{}/{}", kind.dir(), file_name),
            file_size: file.size(),
            file_type: file.content_type,
            file_name,
        })
    }
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{DrawMode, settings_entity};

/// 设置（已按默认值补全）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    /// 背景图片地址，未设置为空字符串
    pub background_image: String,
    /// 中奖音效地址，未设置为空字符串
    pub audio_url: String,
    pub draw_mode: DrawMode,
    pub show_congratulation_modal: bool,
}

impl Default for SettingsResponse {
    fn default() -> Self {
        Self {
            background_image: String::new(),
            audio_url: String::new(),
            draw_mode: DrawMode::OneByOne,
            show_congratulation_modal: true,
        }
    }
}

impl From<settings_entity::Model> for SettingsResponse {
    fn from(m: settings_entity::Model) -> Self {
        let defaults = SettingsResponse::default();
        SettingsResponse {
            background_image: m.background_image.unwrap_or(defaults.background_image),
            audio_url: m.audio_url.unwrap_or(defaults.audio_url),
            draw_mode: m.draw_mode.unwrap_or(defaults.draw_mode),
            show_congratulation_modal: m
                .show_congratulation_modal
                .unwrap_or(defaults.show_congratulation_modal),
        }
    }
}

impl SettingsResponse {
    pub fn draw_settings(&self) -> DrawSettings {
        DrawSettings {
            mode: self.draw_mode,
            show_congratulation: self.show_congratulation_modal,
        }
    }
}

/// 更新设置：只合并提供的字段
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub background_image: Option<String>,
    pub audio_url: Option<String>,
    pub draw_mode: Option<DrawMode>,
    pub show_congratulation_modal: Option<bool>,
}

/// 抽奖引擎关心的设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawSettings {
    pub mode: DrawMode,
    pub show_congratulation: bool,
}

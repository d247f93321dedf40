use crate::entities::settings_entity as settings;
use crate::error::AppResult;
use crate::models::{SettingsResponse, UpdateSettingsRequest};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};

/// 设置只有一行
const SETTINGS_ROW_ID: i32 = 1;

#[derive(Clone)]
pub struct SettingsService {
    pool: DatabaseConnection,
}

impl SettingsService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 读取设置，未保存过的字段用默认值补全
    pub async fn get(&self) -> AppResult<SettingsResponse> {
        let row = settings::Entity::find_by_id(SETTINGS_ROW_ID)
            .one(&self.pool)
            .await?;
        Ok(row.map(Into::into).unwrap_or_default())
    }

    /// 合并提供的字段并保存
    pub async fn set(&self, req: UpdateSettingsRequest) -> AppResult<SettingsResponse> {
        let existing = settings::Entity::find_by_id(SETTINGS_ROW_ID)
            .one(&self.pool)
            .await?;

        let saved = match existing {
            Some(model) => {
                let mut am = model.into_active_model();
                if let Some(v) = req.background_image {
                    am.background_image = Set(Some(v));
                }
                if let Some(v) = req.audio_url {
                    am.audio_url = Set(Some(v));
                }
                if let Some(v) = req.draw_mode {
                    am.draw_mode = Set(Some(v));
                }
                if let Some(v) = req.show_congratulation_modal {
                    am.show_congratulation_modal = Set(Some(v));
                }
                am.updated_at = Set(Some(Utc::now()));
                am.update(&self.pool).await?
            }
            None => {
                settings::ActiveModel {
                    id: Set(SETTINGS_ROW_ID),
                    background_image: Set(req.background_image),
                    audio_url: Set(req.audio_url),
                    draw_mode: Set(req.draw_mode),
                    show_congratulation_modal: Set(req.show_congratulation_modal),
                    updated_at: Set(Some(Utc::now())),
                }
                .insert(&self.pool)
                .await?
            }
        };

        let resolved: SettingsResponse = saved.into();
        log::info!(
            "Settings updated: mode={}, congratulation={}",
            resolved.draw_mode,
            resolved.show_congratulation_modal
        );
        Ok(resolved)
    }
}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 抽奖模式
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
pub enum DrawMode {
    /// 每次抽出一名
    #[default]
    #[serde(rename = "one-by-one")]
    #[sea_orm(string_value = "one-by-one")]
    OneByOne,
    /// 连续抽完剩余名额
    #[serde(rename = "all-at-once")]
    #[sea_orm(string_value = "all-at-once")]
    AllAtOnce,
}

impl std::fmt::Display for DrawMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawMode::OneByOne => write!(f, "one-by-one"),
            DrawMode::AllAtOnce => write!(f, "all-at-once"),
        }
    }
}

/// 全局设置（单行，id = 1）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub background_image: Option<String>,
    pub audio_url: Option<String>,
    pub draw_mode: Option<DrawMode>,
    pub show_congratulation_modal: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 中奖名单（按中奖顺序），以 JSON 数组存储
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct WinnerList(pub Vec<String>);

/// 奖项实体
/// - total_quantity: 名额总数 (> 0)
/// - remaining_quantity: 剩余名额，应等于 total_quantity - winners.len()（由抽奖引擎维护）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "rewards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub image: String,
    pub total_quantity: i64,
    pub remaining_quantity: i64,
    #[sea_orm(column_type = "Json")]
    pub winners: WinnerList,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

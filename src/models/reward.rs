use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::entities::reward_entity;

/// 奖项（接口与缓存使用的领域模型）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    /// 奖项ID（创建时生成）
    pub id: String,
    /// 奖项名称
    pub name: String,
    /// 奖品图片地址
    pub image: String,
    /// 名额总数
    pub total_quantity: i64,
    /// 剩余名额
    pub remaining_quantity: i64,
    /// 中奖名单（按中奖顺序）
    pub winners: Vec<String>,
}

impl Reward {
    /// 按字段合并部分更新（未提供的字段保持不变）
    pub fn apply_patch(&mut self, patch: &RewardPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(image) = &patch.image {
            self.image = image.clone();
        }
        if let Some(total) = patch.total_quantity {
            self.total_quantity = total;
        }
        if let Some(remaining) = patch.remaining_quantity {
            self.remaining_quantity = remaining;
        }
        if let Some(winners) = &patch.winners {
            self.winners = winners.clone();
        }
    }

    pub fn with_patch(&self, patch: &RewardPatch) -> Reward {
        let mut next = self.clone();
        next.apply_patch(patch);
        next
    }

    /// remaining == total - |winners|
    pub fn is_consistent(&self) -> bool {
        self.remaining_quantity == self.total_quantity - self.winners.len() as i64
    }

    pub fn has_quota(&self) -> bool {
        self.remaining_quantity > 0
    }
}

impl From<reward_entity::Model> for Reward {
    fn from(m: reward_entity::Model) -> Self {
        Reward {
            id: m.id,
            name: m.name,
            image: m.image,
            total_quantity: m.total_quantity,
            remaining_quantity: m.remaining_quantity,
            winners: m.winners.0,
        }
    }
}

/// 所有奖项中奖者的并集（一人全局只能中一次）
pub fn global_winner_set(rewards: &[Reward]) -> HashSet<&str> {
    rewards
        .iter()
        .flat_map(|r| r.winners.iter().map(String::as_str))
        .collect()
}

/// 奖项的部分更新，写入时按字段合并
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winners: Option<Vec<String>>,
}

impl RewardPatch {
    /// 追加一名中奖者：剩余名额与名单在同一次写入中更新
    pub fn append_winner(current: &Reward, winner: &str) -> Self {
        let mut winners = current.winners.clone();
        winners.push(winner.to_string());
        Self {
            remaining_quantity: Some(current.remaining_quantity - 1),
            winners: Some(winners),
            ..Default::default()
        }
    }
}

/// 新建奖项
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRewardRequest {
    #[schema(example = "Grand Prize")]
    pub name: String,
    #[schema(example = "/rewards/reward-1729300000000.png")]
    pub image: String,
    #[schema(example = 3)]
    pub total_quantity: i64,
}

/// 管理员编辑奖项（剩余名额由服务端按中奖人数重新计算）
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRewardRequest {
    pub name: Option<String>,
    pub image: Option<String>,
    pub total_quantity: Option<i64>,
}

/// 奖项统计
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RewardSummary {
    pub reward_count: usize,
    pub total_winners: usize,
    pub total_remaining: i64,
}

impl RewardSummary {
    pub fn from_rewards(rewards: &[Reward]) -> Self {
        RewardSummary {
            reward_count: rewards.len(),
            total_winners: rewards.iter().map(|r| r.winners.len()).sum(),
            total_remaining: rewards.iter().map(|r| r.remaining_quantity).sum(),
        }
    }
}

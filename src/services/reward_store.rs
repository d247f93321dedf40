use crate::entities::{WinnerList, reward_entity as rewards};
use crate::error::{AppError, AppResult};
use crate::models::{Reward, RewardPatch};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryOrder, Set,
};

/// 新建奖项所需字段（id、剩余名额、名单由存储生成）
#[derive(Debug, Clone)]
pub struct NewReward {
    pub name: String,
    pub image: String,
    pub total_quantity: i64,
}

/// 奖项的持久化存储
///
/// 存储只做字段合并，不检查 remaining_quantity 与 winners 是否一致；
/// 调用方需要在同一次 update 中同时提交这两个字段。
#[async_trait]
pub trait RewardStore: Send + Sync {
    /// 按创建顺序返回全部奖项
    async fn list(&self) -> AppResult<Vec<Reward>>;

    /// 创建奖项：生成 id，remaining = total，winners = []
    async fn create(&self, new_reward: NewReward) -> AppResult<Reward>;

    /// 合并部分字段并返回更新后的记录；不存在返回 NotFound
    async fn update(&self, id: &str, patch: RewardPatch) -> AppResult<Reward>;

    /// 删除奖项；不存在返回 NotFound
    async fn delete(&self, id: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct SeaOrmRewardStore {
    pool: DatabaseConnection,
}

impl SeaOrmRewardStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RewardStore for SeaOrmRewardStore {
    async fn list(&self) -> AppResult<Vec<Reward>> {
        let list = rewards::Entity::find()
            .order_by_asc(rewards::Column::CreatedAt)
            .order_by_asc(rewards::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn create(&self, new_reward: NewReward) -> AppResult<Reward> {
        let now = Utc::now();
        let model = rewards::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(new_reward.name),
            image: Set(new_reward.image),
            total_quantity: Set(new_reward.total_quantity),
            remaining_quantity: Set(new_reward.total_quantity),
            winners: Set(WinnerList::default()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.pool)
        .await?;

        log::info!("Reward created: {} - {}", model.id, model.name);
        Ok(model.into())
    }

    async fn update(&self, id: &str, patch: RewardPatch) -> AppResult<Reward> {
        let current = rewards::Entity::find_by_id(id.to_string())
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reward {id} not found")))?;

        let mut am = current.into_active_model();
        if let Some(name) = patch.name {
            am.name = Set(name);
        }
        if let Some(image) = patch.image {
            am.image = Set(image);
        }
        if let Some(total) = patch.total_quantity {
            am.total_quantity = Set(total);
        }
        if let Some(remaining) = patch.remaining_quantity {
            am.remaining_quantity = Set(remaining);
        }
        if let Some(winners) = patch.winners {
            am.winners = Set(WinnerList(winners));
        }
        am.updated_at = Set(Utc::now());

        let updated = am.update(&self.pool).await?;
        Ok(updated.into())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let res = rewards::Entity::delete_by_id(id.to_string())
            .exec(&self.pool)
            .await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Reward {id} not found")));
        }
        log::info!("Reward deleted: {id}");
        Ok(())
    }
}

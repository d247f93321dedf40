use crate::error::{AppError, AppResult};
use crate::models::{
    CreateRewardRequest, Reward, RewardPatch, RewardSummary, UpdateRewardRequest,
};
use crate::services::{NewReward, RewardCache, RewardStore};
use std::sync::Arc;

/// 奖项管理（后台编辑页使用）
#[derive(Clone)]
pub struct RewardService {
    store: Arc<dyn RewardStore>,
    cache: RewardCache,
}

impl RewardService {
    pub fn new(store: Arc<dyn RewardStore>, cache: RewardCache) -> Self {
        Self { store, cache }
    }

    pub async fn list(&self) -> Vec<Reward> {
        self.cache.snapshot().await
    }

    pub async fn get(&self, id: &str) -> AppResult<Reward> {
        self.cache
            .get(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Reward {id} not found")))
    }

    pub async fn create(&self, req: CreateRewardRequest) -> AppResult<Reward> {
        let name = validate_name(&req.name)?;
        let image = validate_image(&req.image)?;
        validate_total(req.total_quantity)?;

        let reward = self
            .store
            .create(NewReward {
                name,
                image,
                total_quantity: req.total_quantity,
            })
            .await?;
        self.cache.insert(reward.clone()).await;
        Ok(reward)
    }

    /// 编辑名称、图片、总名额；剩余名额按当前中奖人数重新计算，
    /// 与中奖名单在同一次写入中提交
    pub async fn edit(&self, id: &str, req: UpdateRewardRequest) -> AppResult<Reward> {
        // 中奖名单取自加锁时的最新记录，不会覆盖并发写入的中奖人
        let pending = self
            .cache
            .apply_optimistic_with(id, |current| edit_patch(current, &req))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reward {id} not found")))?;
        let patch = pending.patch().clone();

        match self.store.update(id, patch).await {
            Ok(saved) => {
                self.cache.reconcile(pending, saved.clone()).await;
                log::info!(
                    "Reward {} edited: total={}, remaining={}",
                    saved.id,
                    saved.total_quantity,
                    saved.remaining_quantity
                );
                Ok(saved)
            }
            Err(e) => {
                self.cache.rollback(pending).await;
                log::error!("Failed to save reward {id}: {e}");
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = self.store.delete(id).await;
        // 存储中已不存在时缓存也一并清掉
        if matches!(result, Ok(()) | Err(AppError::NotFound(_))) {
            self.cache.remove(id).await;
        }
        result
    }

    pub async fn summary(&self) -> RewardSummary {
        RewardSummary::from_rewards(&self.cache.snapshot().await)
    }
}

/// 根据编辑请求生成一次完整写入
pub fn edit_patch(current: &Reward, req: &UpdateRewardRequest) -> AppResult<RewardPatch> {
    let name = req.name.as_deref().map(validate_name).transpose()?;
    let image = req.image.as_deref().map(validate_image).transpose()?;
    if let Some(total) = req.total_quantity {
        validate_total(total)?;
    }

    let total = req.total_quantity.unwrap_or(current.total_quantity);
    let remaining = (total - current.winners.len() as i64).max(0);

    Ok(RewardPatch {
        name,
        image,
        total_quantity: Some(total),
        remaining_quantity: Some(remaining),
        winners: Some(current.winners.clone()),
    })
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::ValidationError(
            "Reward name is required".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_image(image: &str) -> AppResult<String> {
    let image = image.trim();
    if image.is_empty() {
        return Err(AppError::ValidationError(
            "Reward image is required".to_string(),
        ));
    }
    Ok(image.to_string())
}

fn validate_total(total: i64) -> AppResult<()> {
    if total <= 0 {
        return Err(AppError::ValidationError(
            "Total quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

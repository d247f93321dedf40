//! In-memory reward list shared by the admin paths and the draw engine.
//!
//! The cache is the single source of truth for eligibility checks. Writes go
//! through a two-phase mutation: `apply_optimistic` merges the patch right away
//! and hands back a [`PendingMutation`]; the caller then either `reconcile`s it
//! with the record returned by the store or `rollback`s it to the saved entry.

use crate::error::AppResult;
use crate::models::{Reward, RewardPatch};
use crate::services::RewardStore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// 乐观写入的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
}

/// 已应用到缓存、尚未确认的写入
#[derive(Debug)]
#[must_use = "a pending mutation must be reconciled or rolled back"]
pub struct PendingMutation {
    token: u64,
    reward_id: String,
    before: Reward,
    patch: RewardPatch,
}

impl PendingMutation {
    pub fn state(&self) -> MutationState {
        MutationState::Pending
    }

    pub fn reward_id(&self) -> &str {
        &self.reward_id
    }

    pub fn patch(&self) -> &RewardPatch {
        &self.patch
    }

    /// 写入前的奖项快照
    pub fn before(&self) -> &Reward {
        &self.before
    }
}

#[derive(Default)]
struct CacheState {
    rewards: Vec<Reward>,
    /// token -> reward_id
    pending: HashMap<u64, String>,
    next_token: u64,
    /// 每次本地写入递增
    version: u64,
    /// reward_id -> 最近一次本地写入时的 version
    touched: HashMap<String, u64>,
}

impl CacheState {
    fn has_pending(&self, reward_id: &str) -> bool {
        self.pending.values().any(|id| id == reward_id)
    }

    fn touch(&mut self, reward_id: &str) {
        self.version += 1;
        self.touched.insert(reward_id.to_string(), self.version);
    }

    /// 在 `since` 之后被本地改动过，或仍有未确认的写入
    fn changed_since(&self, reward_id: &str, since: u64) -> bool {
        self.has_pending(reward_id)
            || self
                .touched
                .get(reward_id)
                .is_some_and(|version| *version > since)
    }

    fn apply(&mut self, reward_id: &str, patch: RewardPatch) -> Option<PendingMutation> {
        let entry = self.rewards.iter_mut().find(|r| r.id == reward_id)?;
        let before = entry.clone();
        entry.apply_patch(&patch);

        self.next_token += 1;
        let token = self.next_token;
        self.pending.insert(token, reward_id.to_string());
        self.touch(reward_id);

        log::debug!("Optimistic update applied to reward {reward_id} (token {token})");
        Some(PendingMutation {
            token,
            reward_id: reward_id.to_string(),
            before,
            patch,
        })
    }
}

#[derive(Clone, Default)]
pub struct RewardCache {
    state: Arc<RwLock<CacheState>>,
}

impl RewardCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rewards(rewards: Vec<Reward>) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState {
                rewards,
                ..Default::default()
            })),
        }
    }

    /// 最新的奖项列表（包含尚未确认的乐观写入）
    pub async fn snapshot(&self) -> Vec<Reward> {
        self.state.read().await.rewards.clone()
    }

    pub async fn get(&self, reward_id: &str) -> Option<Reward> {
        self.state
            .read()
            .await
            .rewards
            .iter()
            .find(|r| r.id == reward_id)
            .cloned()
    }

    /// 立即合并部分更新；奖项不存在时返回 None
    pub async fn apply_optimistic(
        &self,
        reward_id: &str,
        patch: RewardPatch,
    ) -> Option<PendingMutation> {
        self.state.write().await.apply(reward_id, patch)
    }

    /// 在同一次加锁内读取当前记录、生成并应用更新
    pub async fn apply_optimistic_with<F>(
        &self,
        reward_id: &str,
        build: F,
    ) -> AppResult<Option<PendingMutation>>
    where
        F: FnOnce(&Reward) -> AppResult<RewardPatch>,
    {
        let mut state = self.state.write().await;
        let Some(current) = state.rewards.iter().find(|r| r.id == reward_id) else {
            return Ok(None);
        };
        let patch = build(current)?;
        Ok(state.apply(reward_id, patch))
    }

    /// 写入成功：用存储返回的记录替换乐观结果
    pub async fn reconcile(&self, pending: PendingMutation, server_record: Reward) -> MutationState {
        let mut state = self.state.write().await;
        state.pending.remove(&pending.token);
        state.touch(&pending.reward_id);
        match state
            .rewards
            .iter_mut()
            .find(|r| r.id == pending.reward_id)
        {
            Some(entry) => *entry = server_record,
            None => {
                // 写入期间被删除（例如刷新后消失），不再插回
                log::debug!(
                    "Reward {} vanished before reconcile, dropping server record",
                    pending.reward_id
                );
            }
        }
        MutationState::Committed
    }

    /// 写入失败：恢复该奖项写入前的状态
    pub async fn rollback(&self, pending: PendingMutation) -> MutationState {
        let mut state = self.state.write().await;
        state.pending.remove(&pending.token);
        state.touch(&pending.reward_id);
        if let Some(entry) = state
            .rewards
            .iter_mut()
            .find(|r| r.id == pending.reward_id)
        {
            *entry = pending.before;
        }
        log::warn!("Optimistic update on reward {} rolled back", pending.reward_id);
        MutationState::RolledBack
    }

    pub async fn insert(&self, reward: Reward) {
        let mut state = self.state.write().await;
        state.touch(&reward.id);
        match state.rewards.iter_mut().find(|r| r.id == reward.id) {
            Some(entry) => *entry = reward,
            None => state.rewards.push(reward),
        }
    }

    pub async fn remove(&self, reward_id: &str) {
        let mut state = self.state.write().await;
        state.touch(reward_id);
        state.rewards.retain(|r| r.id != reward_id);
    }

    /// 用存储中的列表替换缓存；正在写入的奖项保留本地版本
    pub async fn replace_all(&self, fresh: Vec<Reward>) {
        let since = self.state.read().await.version;
        self.merge_fresh(fresh, since).await;
    }

    /// 从存储重新拉取（轮询刷新）
    ///
    /// 拉取期间本地写入过的奖项以本地为准，避免旧列表覆盖刚确认的中奖人。
    pub async fn refresh(&self, store: &dyn RewardStore) -> AppResult<usize> {
        let since = self.state.read().await.version;
        let fresh = store.list().await?;
        let count = fresh.len();
        self.merge_fresh(fresh, since).await;
        Ok(count)
    }

    async fn merge_fresh(&self, fresh: Vec<Reward>, since: u64) {
        let mut state = self.state.write().await;
        let fresh_ids: HashSet<String> = fresh.iter().map(|r| r.id.clone()).collect();

        let mut merged = Vec::with_capacity(fresh.len());
        for reward in fresh {
            if !state.changed_since(&reward.id, since) {
                merged.push(reward);
                continue;
            }
            // 本地已删除的奖项不再从旧列表中恢复
            if let Some(local) = state.rewards.iter().find(|r| r.id == reward.id) {
                merged.push(local.clone());
            }
        }
        // 拉取期间本地新建的奖项
        let created: Vec<Reward> = state
            .rewards
            .iter()
            .filter(|r| !fresh_ids.contains(&r.id) && state.changed_since(&r.id, since))
            .cloned()
            .collect();
        merged.extend(created);

        if merged != state.rewards {
            log::debug!("Reward cache refreshed: {} reward(s)", merged.len());
        }
        state.rewards = merged;
    }

    pub async fn pending_count(&self) -> usize {
        self.state.read().await.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::NewReward;
    use crate::services::reward_store::memory::MemoryRewardStore;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// list() 先取快照，再等待放行，模拟慢查询
    struct SlowListStore {
        rewards: Vec<Reward>,
        listed: Notify,
        release: Notify,
    }

    impl SlowListStore {
        fn new(rewards: Vec<Reward>) -> Self {
            Self {
                rewards,
                listed: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl RewardStore for SlowListStore {
        async fn list(&self) -> AppResult<Vec<Reward>> {
            let snapshot = self.rewards.clone();
            self.listed.notify_one();
            self.release.notified().await;
            Ok(snapshot)
        }

        async fn create(&self, _new_reward: NewReward) -> AppResult<Reward> {
            Err(AppError::InternalError("read only".into()))
        }

        async fn update(&self, _id: &str, _patch: RewardPatch) -> AppResult<Reward> {
            Err(AppError::InternalError("read only".into()))
        }

        async fn delete(&self, _id: &str) -> AppResult<()> {
            Err(AppError::InternalError("read only".into()))
        }
    }

    fn reward(id: &str, total: i64, winners: &[&str]) -> Reward {
        Reward {
            id: id.to_string(),
            name: id.to_uppercase(),
            image: String::new(),
            total_quantity: total,
            remaining_quantity: total - winners.len() as i64,
            winners: winners.iter().map(|w| w.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_optimistic_update_is_visible_before_commit() {
        let cache = RewardCache::with_rewards(vec![reward("a", 2, &[])]);
        let current = cache.get("a").await.unwrap();

        let pending = cache
            .apply_optimistic("a", RewardPatch::append_winner(&current, "Ann"))
            .await
            .unwrap();

        let snap = cache.snapshot().await;
        assert_eq!(snap[0].winners, vec!["Ann"]);
        assert_eq!(snap[0].remaining_quantity, 1);
        assert_eq!(cache.pending_count().await, 1);
        assert_eq!(pending.before().remaining_quantity, 2);
        assert_eq!(pending.state(), MutationState::Pending);

        let state = cache.reconcile(pending, snap[0].clone()).await;
        assert_eq!(state, MutationState::Committed);
        assert_eq!(cache.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_rollback_restores_entry() {
        let cache = RewardCache::with_rewards(vec![reward("a", 2, &["Ann"]), reward("b", 1, &[])]);
        let current = cache.get("a").await.unwrap();

        let pending = cache
            .apply_optimistic("a", RewardPatch::append_winner(&current, "Bob"))
            .await
            .unwrap();
        let state = cache.rollback(pending).await;

        assert_eq!(state, MutationState::RolledBack);
        assert_eq!(cache.get("a").await.unwrap(), current);
        assert_eq!(cache.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_apply_optimistic_unknown_reward() {
        let cache = RewardCache::with_rewards(vec![reward("a", 1, &[])]);
        let pending = cache
            .apply_optimistic("missing", RewardPatch::default())
            .await;
        assert!(pending.is_none());
    }

    #[tokio::test]
    async fn test_refresh_keeps_pending_entry() {
        let cache = RewardCache::with_rewards(vec![reward("a", 2, &[]), reward("b", 1, &[])]);
        let current = cache.get("a").await.unwrap();
        let pending = cache
            .apply_optimistic("a", RewardPatch::append_winner(&current, "Ann"))
            .await
            .unwrap();

        // 存储中还没有这次写入，b 被外部改名，另有新奖项 c
        let mut b = reward("b", 1, &[]);
        b.name = "Renamed".into();
        let store = MemoryRewardStore::with_rewards(vec![reward("a", 2, &[]), b, reward("c", 1, &[])]);
        let count = cache.refresh(&store).await.unwrap();
        assert_eq!(count, 3);

        let snap = cache.snapshot().await;
        assert_eq!(snap[0].winners, vec!["Ann"]);
        assert_eq!(snap[1].name, "Renamed");
        assert_eq!(snap[2].id, "c");

        let _ = cache.rollback(pending).await;
        assert!(cache.get("a").await.unwrap().winners.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_drops_rewards_deleted_elsewhere() {
        let cache = RewardCache::with_rewards(vec![reward("a", 1, &[]), reward("b", 1, &[])]);
        cache.replace_all(vec![reward("b", 1, &[])]).await;
        let ids: Vec<String> = cache.snapshot().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn test_refresh_keeps_winner_committed_while_listing() {
        let store = Arc::new(SlowListStore::new(vec![reward("a", 1, &[])]));
        let cache = RewardCache::with_rewards(vec![reward("a", 1, &[])]);

        let refresh = tokio::spawn({
            let cache = cache.clone();
            let store = store.clone();
            async move { cache.refresh(store.as_ref()).await }
        });
        store.listed.notified().await;

        // 列表已取出后，一次抽奖写入完成并确认
        let current = cache.get("a").await.unwrap();
        let pending = cache
            .apply_optimistic("a", RewardPatch::append_winner(&current, "Bob"))
            .await
            .unwrap();
        let saved = reward("a", 1, &["Bob"]);
        cache.reconcile(pending, saved.clone()).await;

        store.release.notify_one();
        assert_eq!(refresh.await.unwrap().unwrap(), 1);

        assert_eq!(cache.get("a").await.unwrap(), saved);
        assert_eq!(cache.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_refresh_does_not_resurrect_reward_removed_while_listing() {
        let store = Arc::new(SlowListStore::new(vec![reward("a", 1, &[]), reward("b", 1, &[])]));
        let cache = RewardCache::with_rewards(vec![reward("a", 1, &[]), reward("b", 1, &[])]);

        let refresh = tokio::spawn({
            let cache = cache.clone();
            let store = store.clone();
            async move { cache.refresh(store.as_ref()).await }
        });
        store.listed.notified().await;
        cache.remove("a").await;
        cache.insert(reward("c", 2, &[])).await;
        store.release.notify_one();
        refresh.await.unwrap().unwrap();

        let ids: Vec<String> = cache.snapshot().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "c"]);

        // 之后的刷新以存储为准
        cache.replace_all(vec![reward("b", 1, &[])]).await;
        let ids: Vec<String> = cache.snapshot().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test]
    async fn test_apply_optimistic_with_builds_from_current_entry() {
        let cache = RewardCache::with_rewards(vec![reward("a", 3, &["Ann"])]);

        let pending = cache
            .apply_optimistic_with("a", |current| Ok(RewardPatch::append_winner(current, "Bob")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pending.patch().winners, Some(names(&["Ann", "Bob"])));
        assert_eq!(cache.get("a").await.unwrap().remaining_quantity, 1);

        let err = cache
            .apply_optimistic_with("a", |_| Err(AppError::ValidationError("bad".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(cache.pending_count().await, 1);

        let missing = cache
            .apply_optimistic_with("missing", |current| {
                Ok(RewardPatch::append_winner(current, "Cid"))
            })
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }
}

//! Background tasks for the application.
//!
//! Call `spawn_all` once during startup; tasks are detached with `tokio::spawn`.

use crate::config::RefreshConfig;
use crate::services::{RewardCache, RewardStore};
use std::sync::Arc;

/// Spawn all background tasks.
pub fn spawn_all(reward_cache: RewardCache, store: Arc<dyn RewardStore>, refresh: RefreshConfig) {
    // 奖项缓存轮询刷新，让其它页面的修改最终可见
    if refresh.reward_poll_secs == 0 {
        log::info!("Reward cache polling disabled");
        return;
    }

    let interval = std::time::Duration::from_secs(refresh.reward_poll_secs);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match reward_cache.refresh(store.as_ref()).await {
                Ok(n) => log::debug!("Reward cache refreshed: {n} rewards"),
                Err(e) => log::error!("Failed to refresh reward cache: {e:?}"),
            }
        }
    });
}

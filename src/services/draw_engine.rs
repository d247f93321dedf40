//! Draw sequencing.
//!
//! Every step re-reads the cache before picking, asks the reel to land on the
//! chosen name, validates again against the latest cache once the reel settles,
//! and writes `remainingQuantity` and `winners` together in a single update.
//! Steps of a bulk draw run strictly one after another; a step's write is
//! confirmed or rolled back before the next step looks at eligibility.

use crate::config::DrawConfig;
use crate::entities::DrawMode;
use crate::error::{AppError, AppResult};
use crate::models::{
    DeclineReason, DrawEvent, DrawPlan, DrawReport, DrawSettings, DrawStatusResponse, DrawStop,
    RaceLostReason, Reward, RewardPatch, StepOutcome, global_winner_set,
};
use crate::services::{
    AnimatorError, DrawEventBus, ParticipantRoster, RevealAnimator, RewardCache, RewardStore,
};
use rand::seq::SliceRandom;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 名单中尚未在任何奖项中奖的人（重名各自保留）
pub fn eligible_participants(participants: &[String], rewards: &[Reward]) -> Vec<String> {
    let won = global_winner_set(rewards);
    participants
        .iter()
        .filter(|name| !won.contains(name.as_str()))
        .cloned()
        .collect()
}

#[derive(Clone)]
pub struct DrawEngine {
    store: Arc<dyn RewardStore>,
    cache: RewardCache,
    roster: ParticipantRoster,
    animator: Arc<dyn RevealAnimator>,
    events: DrawEventBus,
    config: DrawConfig,
    running: Arc<Mutex<()>>,
}

impl DrawEngine {
    pub fn new(
        store: Arc<dyn RewardStore>,
        cache: RewardCache,
        roster: ParticipantRoster,
        animator: Arc<dyn RevealAnimator>,
        events: DrawEventBus,
        config: DrawConfig,
    ) -> Self {
        Self {
            store,
            cache,
            roster,
            animator,
            events,
            config,
            running: Arc::new(Mutex::new(())),
        }
    }

    pub fn events(&self) -> &DrawEventBus {
        &self.events
    }

    pub fn is_drawing(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// 基于最新缓存计算可抽名单
    pub async fn eligible(&self) -> Vec<String> {
        let participants = self.roster.snapshot().await;
        let rewards = self.cache.snapshot().await;
        eligible_participants(&participants, &rewards)
    }

    pub async fn status(&self) -> DrawStatusResponse {
        DrawStatusResponse {
            animator: self.animator.state(),
            drawing: self.is_drawing(),
            participant_count: self.roster.len().await,
            eligible_count: self.eligible().await.len(),
        }
    }

    /// 预检：本次会抽几人，或为何不抽
    pub async fn plan(&self, reward_id: &str, settings: DrawSettings) -> AppResult<DrawPlan> {
        let mut plan = self.compute_plan(reward_id, settings).await?;
        if plan.declined.is_none() && self.is_drawing() {
            plan.planned = 0;
            plan.declined = Some(DeclineReason::DrawInProgress);
        }
        Ok(plan)
    }

    /// 抽奖并等待整个序列结束
    pub async fn draw(&self, reward_id: &str, settings: DrawSettings) -> AppResult<DrawReport> {
        let Ok(_guard) = self.running.clone().try_lock_owned() else {
            log::info!("Draw for reward {reward_id} declined: another draw is running");
            return Ok(DrawReport::declined(
                reward_id,
                settings.mode,
                DeclineReason::DrawInProgress,
            ));
        };
        self.run_sequence(reward_id, settings).await
    }

    /// 预检通过后在后台运行序列，立即返回计划
    pub async fn start(&self, reward_id: &str, settings: DrawSettings) -> AppResult<DrawPlan> {
        let Ok(guard) = self.running.clone().try_lock_owned() else {
            let mut plan = self.compute_plan(reward_id, settings).await?;
            plan.planned = 0;
            plan.declined = Some(DeclineReason::DrawInProgress);
            return Ok(plan);
        };

        let plan = self.compute_plan(reward_id, settings).await?;
        if plan.declined.is_some() {
            return Ok(plan);
        }

        let engine = self.clone();
        let reward_id = reward_id.to_string();
        tokio::spawn(async move {
            let _guard = guard;
            match engine.run_sequence(&reward_id, settings).await {
                Ok(report) => log::debug!(
                    "Background draw for reward {reward_id} finished: {:?}",
                    report.stop
                ),
                Err(e) => log::error!("Background draw for reward {reward_id} failed: {e}"),
            }
        });
        Ok(plan)
    }

    async fn compute_plan(&self, reward_id: &str, settings: DrawSettings) -> AppResult<DrawPlan> {
        let reward = self
            .cache
            .get(reward_id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Reward {reward_id} not found")))?;
        let eligible = self.eligible().await.len();

        let declined = if !reward.has_quota() {
            Some(DeclineReason::NoRemainingQuantity)
        } else if eligible == 0 {
            Some(DeclineReason::NoEligibleParticipants)
        } else {
            None
        };
        let planned = match (declined, settings.mode) {
            (Some(_), _) => 0,
            (None, DrawMode::OneByOne) => 1,
            (None, DrawMode::AllAtOnce) => (reward.remaining_quantity as usize).min(eligible),
        };

        Ok(DrawPlan {
            reward_id: reward_id.to_string(),
            mode: settings.mode,
            planned,
            eligible,
            declined,
        })
    }

    /// 调用方需持有 running 锁
    async fn run_sequence(&self, reward_id: &str, settings: DrawSettings) -> AppResult<DrawReport> {
        let plan = self.compute_plan(reward_id, settings).await?;
        if let Some(reason) = plan.declined {
            log::info!("Draw for reward {reward_id} declined: {reason:?}");
            return Ok(DrawReport::declined(reward_id, settings.mode, reason));
        }

        self.events.publish(DrawEvent::SequenceStarted {
            reward_id: reward_id.to_string(),
            mode: settings.mode,
            planned: plan.planned,
        });

        let report = match settings.mode {
            DrawMode::OneByOne => self.draw_one(reward_id, settings).await,
            DrawMode::AllAtOnce => self.draw_all(reward_id, settings, plan.planned).await,
        };

        log::info!(
            "Draw for reward {reward_id} finished with {} winner(s): {:?}",
            report.winners.len(),
            report.stop
        );
        self.events.publish(DrawEvent::SequenceFinished {
            reward_id: reward_id.to_string(),
            winners: report.winners.clone(),
            stop: report.stop.clone(),
        });
        Ok(report)
    }

    async fn draw_one(&self, reward_id: &str, settings: DrawSettings) -> DrawReport {
        let mut report = DrawReport::new(reward_id, DrawMode::OneByOne, 1);

        match self.run_step(reward_id).await {
            Ok(StepOutcome::Won { winner, reward }) => {
                self.announce(&reward, &winner, settings.show_congratulation);
                report.winners.push(winner);
            }
            Ok(StepOutcome::Declined(reason)) => {
                report.stop = DrawStop::Declined { reason };
            }
            Ok(StepOutcome::RaceLost { winner, reason }) => {
                report.warnings.push(race_lost_message(&winner, reason));
                report.stop = DrawStop::RaceLost { reason };
            }
            Err(e) => report.stop = self.stop_for_error(reward_id, e),
        }
        report
    }

    async fn draw_all(&self, reward_id: &str, settings: DrawSettings, planned: usize) -> DrawReport {
        let mut report = DrawReport::new(reward_id, DrawMode::AllAtOnce, planned);
        let mut last_won: Option<Reward> = None;
        let mut last_race: Option<RaceLostReason> = None;

        for step in 0..planned {
            if step > 0 {
                tokio::time::sleep(self.config.step_pause(settings.show_congratulation)).await;
            }

            match self.run_step(reward_id).await {
                Ok(StepOutcome::Won { winner, reward }) => {
                    self.announce(&reward, &winner, false);
                    report.winners.push(winner);
                    last_won = Some(reward);
                }
                Ok(StepOutcome::Declined(DeclineReason::NoRemainingQuantity)) => {
                    report.stop = DrawStop::QuotaExhausted;
                    break;
                }
                Ok(StepOutcome::Declined(DeclineReason::NoEligibleParticipants)) => {
                    report.stop = DrawStop::PoolExhausted;
                    break;
                }
                Ok(StepOutcome::Declined(reason)) => {
                    report.stop = DrawStop::Declined { reason };
                    break;
                }
                Ok(StepOutcome::RaceLost { winner, reason }) => {
                    report.warnings.push(race_lost_message(&winner, reason));
                    if reason == RaceLostReason::RewardRemoved {
                        report.stop = DrawStop::RewardRemoved;
                        break;
                    }
                    // 下一步重新计算名额与名单
                    last_race = Some(reason);
                }
                Err(e) => {
                    report.stop = self.stop_for_error(reward_id, e);
                    break;
                }
            }
        }

        if report.stop == DrawStop::Completed
            && report.winners.len() < planned
            && let Some(reason) = last_race
        {
            report.stop = DrawStop::RaceLost { reason };
        }

        // 无论序列如何结束，都祝贺最后一位确认的中奖人
        if settings.show_congratulation
            && let (Some(reward), Some(winner)) = (last_won, report.winners.last())
        {
            self.announce(&reward, winner, true);
        }
        report
    }

    /// 选人 -> 动画 -> 复核 -> 写入
    async fn run_step(&self, reward_id: &str) -> AppResult<StepOutcome> {
        let rewards = self.cache.snapshot().await;
        let reward = rewards
            .iter()
            .find(|r| r.id == reward_id)
            .ok_or_else(|| AppError::NotFound(format!("Reward {reward_id} not found")))?;
        if !reward.has_quota() {
            return Ok(StepOutcome::Declined(DeclineReason::NoRemainingQuantity));
        }

        let participants = self.roster.snapshot().await;
        let eligible = eligible_participants(&participants, &rewards);
        let winner = {
            let mut rng = rand::thread_rng();
            match eligible.choose(&mut rng) {
                Some(name) => name.clone(),
                None => return Ok(StepOutcome::Declined(DeclineReason::NoEligibleParticipants)),
            }
        };

        let handle = match self.animator.animate(winner.clone(), eligible) {
            Ok(handle) => handle,
            Err(AnimatorError::Busy) => {
                return Ok(StepOutcome::Declined(DeclineReason::AnimatorBusy));
            }
            Err(AnimatorError::Unavailable) => return Err(AppError::AnimatorUnavailable),
        };
        let winner = handle
            .settled()
            .await
            .map_err(|_| AppError::AnimatorUnavailable)?;

        // 动画期间缓存可能已变化
        let latest = self.cache.snapshot().await;
        let Some(current) = latest.iter().find(|r| r.id == reward_id) else {
            return Ok(self.race_lost(reward_id, winner, RaceLostReason::RewardRemoved));
        };
        if !current.has_quota() {
            return Ok(self.race_lost(reward_id, winner, RaceLostReason::QuotaExhausted));
        }
        if global_winner_set(&latest).contains(winner.as_str()) {
            return Ok(self.race_lost(reward_id, winner, RaceLostReason::AlreadyWon));
        }

        let patch = RewardPatch::append_winner(current, &winner);
        let Some(pending) = self.cache.apply_optimistic(reward_id, patch.clone()).await else {
            return Ok(self.race_lost(reward_id, winner, RaceLostReason::RewardRemoved));
        };

        let result = tokio::time::timeout(
            self.config.persist_timeout(),
            self.store.update(reward_id, patch),
        )
        .await
        .unwrap_or_else(|_| Err(AppError::PersistenceTimeout(self.config.persist_timeout_ms)));

        match result {
            Ok(saved) => {
                self.cache.reconcile(pending, saved.clone()).await;
                log::info!(
                    "Winner {winner} recorded for reward {reward_id}, {} left",
                    saved.remaining_quantity
                );
                self.events.publish(DrawEvent::WinnerPersisted {
                    reward_id: reward_id.to_string(),
                    winner: winner.clone(),
                    remaining_quantity: saved.remaining_quantity,
                });
                Ok(StepOutcome::Won {
                    winner,
                    reward: saved,
                })
            }
            Err(e) => {
                self.cache.rollback(pending).await;
                log::error!("Failed to record winner {winner} for reward {reward_id}: {e}");
                match e {
                    AppError::NotFound(_) => Err(e),
                    e if e.is_persistence_failure() => Err(e),
                    e => Err(AppError::PersistenceError(e.to_string())),
                }
            }
        }
    }

    fn race_lost(&self, reward_id: &str, winner: String, reason: RaceLostReason) -> StepOutcome {
        let message = race_lost_message(&winner, reason);
        log::warn!("Draw for reward {reward_id}: {message}");
        self.events.publish(DrawEvent::Warning { message });
        StepOutcome::RaceLost { winner, reason }
    }

    fn announce(&self, reward: &Reward, winner: &str, congratulate: bool) {
        let event = if congratulate {
            DrawEvent::Congratulation {
                reward_id: reward.id.clone(),
                reward_name: reward.name.clone(),
                winner: winner.to_string(),
            }
        } else {
            DrawEvent::WinnerCue {
                reward_id: reward.id.clone(),
                winner: winner.to_string(),
            }
        };
        self.events.publish(event);
    }

    fn stop_for_error(&self, reward_id: &str, err: AppError) -> DrawStop {
        match err {
            AppError::NotFound(_) => {
                log::warn!("Reward {reward_id} was removed during the draw");
                self.events.publish(DrawEvent::Warning {
                    message: "The reward was removed during the draw".to_string(),
                });
                DrawStop::RewardRemoved
            }
            AppError::AnimatorUnavailable => {
                log::error!("Draw for reward {reward_id} aborted: reel unavailable");
                self.events.publish(DrawEvent::Error {
                    message: "Drawing stage is unavailable".to_string(),
                });
                DrawStop::AnimatorUnavailable
            }
            e => {
                let message = e.to_string();
                self.events.publish(DrawEvent::Error {
                    message: format!("Failed to save the winner: {message}"),
                });
                DrawStop::PersistenceFailed { message }
            }
        }
    }
}

fn race_lost_message(winner: &str, reason: RaceLostReason) -> String {
    match reason {
        RaceLostReason::QuotaExhausted => {
            format!("{winner} was not recorded: the reward has no remaining quantity")
        }
        RaceLostReason::AlreadyWon => {
            format!("{winner} was not recorded: already won another reward")
        }
        RaceLostReason::RewardRemoved => {
            format!("{winner} was not recorded: the reward was removed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory_pool;
    use crate::models::AnimatorState;
    use crate::services::reward_store::memory::MemoryRewardStore;
    use crate::services::{
        ExportService, NewReward, ReelAnimator, SeaOrmRewardStore, SettleHandle,
    };
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

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

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn one_by_one() -> DrawSettings {
        DrawSettings {
            mode: DrawMode::OneByOne,
            show_congratulation: true,
        }
    }

    fn all_at_once() -> DrawSettings {
        DrawSettings {
            mode: DrawMode::AllAtOnce,
            show_congratulation: true,
        }
    }

    struct Harness {
        engine: DrawEngine,
        store: Arc<MemoryRewardStore>,
        cache: RewardCache,
        events: DrawEventBus,
    }

    fn harness(rewards: Vec<Reward>, participants: &[&str]) -> Harness {
        harness_with(rewards, participants, DrawConfig::immediate(), |_, events| {
            Arc::new(ReelAnimator::new(events, DrawConfig::immediate()))
        })
    }

    fn harness_with(
        rewards: Vec<Reward>,
        participants: &[&str],
        config: DrawConfig,
        animator: impl FnOnce(RewardCache, DrawEventBus) -> Arc<dyn RevealAnimator>,
    ) -> Harness {
        let store = Arc::new(MemoryRewardStore::with_rewards(rewards.clone()));
        let cache = RewardCache::with_rewards(rewards);
        let events = DrawEventBus::new(256);
        let engine = DrawEngine::new(
            store.clone(),
            cache.clone(),
            ParticipantRoster::with_names(names(participants)),
            animator(cache.clone(), events.clone()),
            events.clone(),
            config,
        );
        Harness {
            engine,
            store,
            cache,
            events,
        }
    }

    /// 存储与缓存中的每个奖项都满足 remaining == total - |winners|，且无人重复中奖
    fn assert_consistent(rewards: &[Reward]) {
        let mut seen = HashSet::new();
        for r in rewards {
            assert!(r.is_consistent(), "inconsistent reward {r:?}");
            assert!(r.remaining_quantity >= 0);
            for w in &r.winners {
                assert!(seen.insert(w.clone()), "{w} won twice");
            }
        }
    }

    /// 在第 hijack_at 次（从 0 开始）滚轮停下前篡改缓存，模拟动画期间的外部写入
    struct HijackAnimator {
        cache: RewardCache,
        replacement: fn(&str) -> Reward,
        hijack_at: usize,
        calls: AtomicUsize,
    }

    impl HijackAnimator {
        fn new(cache: RewardCache, replacement: fn(&str) -> Reward) -> Self {
            Self::at(cache, replacement, 0)
        }

        fn at(cache: RewardCache, replacement: fn(&str) -> Reward, hijack_at: usize) -> Self {
            Self {
                cache,
                replacement,
                hijack_at,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl RevealAnimator for HijackAnimator {
        fn animate(&self, target: String, _pool: Vec<String>) -> Result<SettleHandle, AnimatorError> {
            let (tx, rx) = oneshot::channel();
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let cache = self.cache.clone();
            let replacement = (call == self.hijack_at).then(|| (self.replacement)(&target));
            tokio::spawn(async move {
                if let Some(replacement) = replacement {
                    cache.insert(replacement).await;
                }
                let _ = tx.send(target);
            });
            Ok(SettleHandle::new(rx))
        }

        fn state(&self) -> AnimatorState {
            AnimatorState::Idle
        }
    }

    #[test]
    fn test_eligible_excludes_winners_of_every_reward() {
        let rewards = vec![reward("a", 2, &["Ann"]), reward("b", 2, &["Bob"])];
        let eligible = eligible_participants(&names(&["Ann", "Bob", "Cid", "Cid"]), &rewards);
        assert_eq!(eligible, vec!["Cid", "Cid"]);
    }

    #[tokio::test]
    async fn test_single_draw_records_one_winner() {
        let h = harness(vec![reward("a", 2, &[])], &["Ann", "Bob", "Cid"]);
        let report = h.engine.draw("a", one_by_one()).await.unwrap();

        assert_eq!(report.stop, DrawStop::Completed);
        assert_eq!(report.winners.len(), 1);
        let stored = h.store.rewards();
        assert_eq!(stored[0].winners, report.winners);
        assert_eq!(stored[0].remaining_quantity, 1);
        assert_eq!(h.cache.snapshot().await, stored);
        assert_consistent(&stored);
    }

    #[tokio::test]
    async fn test_zero_remaining_is_a_noop() {
        let h = harness(vec![reward("a", 1, &["Ann"])], &["Ann", "Bob"]);
        let report = h.engine.draw("a", one_by_one()).await.unwrap();

        assert_eq!(
            report.stop,
            DrawStop::Declined {
                reason: DeclineReason::NoRemainingQuantity
            }
        );
        assert!(report.winners.is_empty());
        assert_eq!(h.store.update_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.rewards()[0].remaining_quantity, 0);
    }

    #[tokio::test]
    async fn test_empty_pool_is_a_noop() {
        let h = harness(
            vec![reward("a", 2, &["Ann"]), reward("b", 2, &["Bob"])],
            &["Ann", "Bob"],
        );
        let report = h.engine.draw("b", all_at_once()).await.unwrap();

        assert_eq!(
            report.stop,
            DrawStop::Declined {
                reason: DeclineReason::NoEligibleParticipants
            }
        );
        assert_eq!(h.store.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_reward_is_not_found() {
        let h = harness(vec![], &["Ann"]);
        let err = h.engine.draw("missing", one_by_one()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bulk_draw_fills_quota_with_distinct_winners() {
        let h = harness(vec![reward("a", 3, &[])], &["Ann", "Bob", "Cid", "Dee", "Eve"]);
        let report = h.engine.draw("a", all_at_once()).await.unwrap();

        assert_eq!(report.planned, 3);
        assert_eq!(report.stop, DrawStop::Completed);
        assert_eq!(report.winners.len(), 3);
        let distinct: HashSet<_> = report.winners.iter().collect();
        assert_eq!(distinct.len(), 3);

        let stored = h.store.rewards();
        assert_eq!(stored[0].remaining_quantity, 0);
        assert_eq!(stored[0].winners, report.winners);
        assert_consistent(&stored);
    }

    #[tokio::test]
    async fn test_bulk_draw_stops_when_pool_runs_out() {
        let h = harness(
            vec![reward("a", 3, &[]), reward("b", 1, &["Cid"])],
            &["Ann", "Bob", "Cid"],
        );
        let report = h.engine.draw("a", all_at_once()).await.unwrap();

        assert_eq!(report.planned, 2);
        assert_eq!(report.winners.len(), 2);
        let stored = h.store.rewards();
        assert_eq!(stored[0].remaining_quantity, 1);
        assert!(!stored[0].winners.contains(&"Cid".to_string()));
        assert_consistent(&stored);

        let again = h.engine.draw("a", all_at_once()).await.unwrap();
        assert_eq!(
            again.stop,
            DrawStop::Declined {
                reason: DeclineReason::NoEligibleParticipants
            }
        );
    }

    #[tokio::test]
    async fn test_winner_of_one_reward_never_wins_another() {
        for _ in 0..20 {
            let h = harness(vec![reward("a", 1, &[]), reward("b", 1, &[])], &["Ann", "Bob"]);
            let first = h.engine.draw("a", one_by_one()).await.unwrap();
            let second = h.engine.draw("b", one_by_one()).await.unwrap();

            assert_eq!(first.winners.len(), 1);
            assert_eq!(second.winners.len(), 1);
            assert_ne!(first.winners[0], second.winners[0]);
            assert_consistent(&h.store.rewards());
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_rolls_back_and_aborts_bulk() {
        let h = harness(vec![reward("a", 3, &[])], &["Ann", "Bob", "Cid", "Dee"]);
        h.store.fail_after_updates.store(1, Ordering::SeqCst);

        let report = h.engine.draw("a", all_at_once()).await.unwrap();

        assert_eq!(report.winners.len(), 1);
        assert!(report.persistence_failure().is_some());
        assert_eq!(h.store.update_calls.load(Ordering::SeqCst), 2);

        let stored = h.store.rewards();
        assert_eq!(stored[0].remaining_quantity, 2);
        assert_eq!(h.cache.snapshot().await, stored);
        assert_eq!(h.cache.pending_count().await, 0);
        assert_consistent(&stored);
    }

    #[tokio::test]
    async fn test_hung_store_times_out_and_rolls_back() {
        let config = DrawConfig {
            persist_timeout_ms: 20,
            ..DrawConfig::immediate()
        };
        let h = harness_with(vec![reward("a", 1, &[])], &["Ann"], config, |_, events| {
            Arc::new(ReelAnimator::new(events, DrawConfig::immediate()))
        });
        h.store.hang_updates.store(true, Ordering::SeqCst);

        let report = h.engine.draw("a", one_by_one()).await.unwrap();

        let message = report.persistence_failure().unwrap();
        assert!(message.contains("timed out"));
        assert_eq!(h.cache.get("a").await.unwrap(), reward("a", 1, &[]));
    }

    #[tokio::test]
    async fn test_winner_taken_during_spin_is_race_lost() {
        let h = harness_with(
            vec![reward("a", 1, &[]), reward("b", 2, &[])],
            &["Ann"],
            DrawConfig::immediate(),
            |cache, _| {
                Arc::new(HijackAnimator::new(cache, |target| reward("b", 2, &[target])))
            },
        );

        let report = h.engine.draw("a", one_by_one()).await.unwrap();

        assert_eq!(
            report.stop,
            DrawStop::RaceLost {
                reason: RaceLostReason::AlreadyWon
            }
        );
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(h.store.update_calls.load(Ordering::SeqCst), 0);
        assert!(h.cache.get("a").await.unwrap().winners.is_empty());
    }

    #[tokio::test]
    async fn test_quota_taken_during_spin_is_race_lost() {
        let h = harness_with(
            vec![reward("a", 1, &[])],
            &["Ann", "Bob"],
            DrawConfig::immediate(),
            |cache, _| {
                Arc::new(HijackAnimator::new(cache, |_| reward("a", 1, &["Zed"])))
            },
        );

        let report = h.engine.draw("a", one_by_one()).await.unwrap();
        assert_eq!(
            report.stop,
            DrawStop::RaceLost {
                reason: RaceLostReason::QuotaExhausted
            }
        );
        assert_eq!(h.store.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_animator_aborts() {
        let animator = Arc::new(ReelAnimator::new(
            DrawEventBus::default(),
            DrawConfig::immediate(),
        ));
        animator.close();
        let shared: Arc<dyn RevealAnimator> = animator.clone();
        let h = harness_with(
            vec![reward("a", 2, &[])],
            &["Ann", "Bob"],
            DrawConfig::immediate(),
            move |_, _| shared,
        );

        let report = h.engine.draw("a", all_at_once()).await.unwrap();
        assert_eq!(report.stop, DrawStop::AnimatorUnavailable);
        assert!(report.winners.is_empty());
        assert_eq!(h.store.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_draw_while_running_is_declined() {
        let h = harness(vec![reward("a", 2, &[])], &["Ann", "Bob"]);
        let _running = h.engine.running.clone().try_lock_owned().unwrap();

        assert!(h.engine.is_drawing());
        let report = h.engine.draw("a", one_by_one()).await.unwrap();
        assert_eq!(
            report.stop,
            DrawStop::Declined {
                reason: DeclineReason::DrawInProgress
            }
        );
        let plan = h.engine.plan("a", one_by_one()).await.unwrap();
        assert_eq!(plan.declined, Some(DeclineReason::DrawInProgress));
    }

    #[tokio::test]
    async fn test_bulk_draw_cues_every_winner_and_congratulates_the_last() {
        let h = harness(vec![reward("a", 3, &[])], &["Ann", "Bob", "Cid", "Dee"]);
        let mut rx = h.events.subscribe();

        let report = h.engine.draw("a", all_at_once()).await.unwrap();

        let mut names_seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names_seen.push(event);
        }
        let congratulated: Vec<_> = names_seen
            .iter()
            .filter_map(|e| match e {
                DrawEvent::Congratulation { winner, .. } => Some(winner.clone()),
                _ => None,
            })
            .collect();
        let cues = names_seen
            .iter()
            .filter(|e| matches!(e, DrawEvent::WinnerCue { .. }))
            .count();

        assert_eq!(congratulated, vec![report.winners[2].clone()]);
        assert_eq!(cues, 3);
        assert_eq!(names_seen.first().map(DrawEvent::name), Some("sequence_started"));
        assert_eq!(names_seen.last().map(DrawEvent::name), Some("sequence_finished"));
    }

    fn congratulated(rx: &mut tokio::sync::broadcast::Receiver<DrawEvent>) -> Vec<String> {
        let mut winners = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let DrawEvent::Congratulation { winner, .. } = event {
                winners.push(winner);
            }
        }
        winners
    }

    #[tokio::test]
    async fn test_aborted_bulk_draw_congratulates_last_recorded_winner() {
        let h = harness(vec![reward("a", 3, &[])], &["Ann", "Bob", "Cid", "Dee"]);
        h.store.fail_after_updates.store(1, Ordering::SeqCst);
        let mut rx = h.events.subscribe();

        let report = h.engine.draw("a", all_at_once()).await.unwrap();

        assert!(report.persistence_failure().is_some());
        assert_eq!(report.winners.len(), 1);
        assert_eq!(congratulated(&mut rx), report.winners);
    }

    #[tokio::test]
    async fn test_bulk_draw_without_congratulation_sends_none() {
        let h = harness(vec![reward("a", 2, &[])], &["Ann", "Bob", "Cid"]);
        let mut rx = h.events.subscribe();
        let settings = DrawSettings {
            mode: DrawMode::AllAtOnce,
            show_congratulation: false,
        };

        let report = h.engine.draw("a", settings).await.unwrap();

        assert_eq!(report.winners.len(), 2);
        assert!(congratulated(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_race_lost_mid_bulk_reports_shortfall() {
        let h = harness_with(
            vec![reward("a", 3, &[]), reward("b", 2, &[])],
            &["Ann", "Bob", "Cid", "Dee", "Eve"],
            DrawConfig::immediate(),
            |cache, _| {
                Arc::new(HijackAnimator::at(
                    cache,
                    |target| reward("b", 2, &[target]),
                    1,
                ))
            },
        );
        let mut rx = h.events.subscribe();

        let report = h.engine.draw("a", all_at_once()).await.unwrap();

        assert_eq!(report.planned, 3);
        assert_eq!(report.winners.len(), 2);
        assert_eq!(
            report.stop,
            DrawStop::RaceLost {
                reason: RaceLostReason::AlreadyWon
            }
        );
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(h.store.update_calls.load(Ordering::SeqCst), 2);
        assert_eq!(congratulated(&mut rx), vec![report.winners[1].clone()]);

        let stored = h.store.rewards();
        assert_eq!(stored[0].winners, report.winners);
        assert_eq!(stored[0].remaining_quantity, 1);
    }

    #[tokio::test]
    async fn test_background_start_runs_to_completion() {
        let h = harness(vec![reward("a", 2, &[])], &["Ann", "Bob", "Cid"]);
        let plan = h.engine.start("a", all_at_once()).await.unwrap();
        assert_eq!(plan.planned, 2);
        assert!(plan.declined.is_none());

        for _ in 0..100 {
            if !h.engine.is_drawing() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(!h.engine.is_drawing());
        assert_eq!(h.store.rewards()[0].remaining_quantity, 0);
    }

    #[tokio::test]
    async fn test_create_draw_export_round_trip() {
        use calamine::{Data, Reader, Xlsx};
        use std::io::Cursor;

        let store: Arc<dyn RewardStore> = Arc::new(SeaOrmRewardStore::new(memory_pool().await));
        let created = store
            .create(NewReward {
                name: "Laptop".into(),
                image: "/rewards/laptop.png".into(),
                total_quantity: 1,
            })
            .await
            .unwrap();

        let cache = RewardCache::new();
        cache.refresh(store.as_ref()).await.unwrap();
        let events = DrawEventBus::default();
        let engine = DrawEngine::new(
            store.clone(),
            cache,
            ParticipantRoster::with_names(names(&["Ann", "Bob"])),
            Arc::new(ReelAnimator::new(events.clone(), DrawConfig::immediate())),
            events,
            DrawConfig::immediate(),
        );
        let report = engine.draw(&created.id, one_by_one()).await.unwrap();
        let winner = report.winners[0].clone();

        let export = ExportService::new(store).export_winners().await.unwrap();
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(export.bytes)).unwrap();
        let range = workbook.worksheet_range("Winners").unwrap();
        let row: Vec<&Data> = range.rows().nth(1).unwrap().iter().collect();

        assert_eq!(row[0], &Data::String("Laptop".into()));
        let hits = row[3..]
            .iter()
            .filter(|cell| matches!(cell, Data::String(name) if *name == winner))
            .count();
        assert_eq!(hits, 1);
    }
}

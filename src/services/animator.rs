//! Slot-machine style reveal.
//!
//! The winner is decided before the reel starts; the animator only builds a
//! reel that ends on that name, publishes the motion for the stage, waits out
//! the spin and settle hold, then resolves the [`SettleHandle`] exactly once.

use crate::config::DrawConfig;
use crate::models::{AnimatorState, DrawEvent};
use crate::services::DrawEventBus;
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::oneshot;

/// 每一行的高度（像素）
pub const ITEM_HEIGHT: f64 = 90.0;
/// 中奖者之前的随机名字数量
pub const REEL_FILLER_LEN: usize = 40;
/// 中奖者之后的补位数量
pub const REEL_TRAILING_LEN: usize = 2;
pub const REEL_EASING: &str = "cubic-bezier(0.25, 1, 0.5, 1)";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorError {
    #[error("Reel is already spinning")]
    Busy,
    #[error("Reel is unavailable")]
    Unavailable,
}

/// 一次动画的落定通知
pub struct SettleHandle {
    rx: oneshot::Receiver<String>,
}

impl SettleHandle {
    pub(crate) fn new(rx: oneshot::Receiver<String>) -> Self {
        Self { rx }
    }

    /// 等待滚轮停下并返回中奖者；动画被中断时返回 Unavailable
    pub async fn settled(self) -> Result<String, AnimatorError> {
        self.rx.await.map_err(|_| AnimatorError::Unavailable)
    }
}

pub trait RevealAnimator: Send + Sync {
    /// 以 target 为结果开始一次动画；正在转动时返回 Busy
    fn animate(&self, target: String, pool: Vec<String>) -> Result<SettleHandle, AnimatorError>;

    fn state(&self) -> AnimatorState;
}

/// 滚轮内容，items[target_index] 为中奖者
#[derive(Debug, Clone, PartialEq)]
pub struct Reel {
    pub items: Vec<String>,
    pub target_index: usize,
}

impl Reel {
    /// 停止时的纵向位移：中奖者停在三行窗口的中间一行
    pub fn target_offset(&self) -> f64 {
        -((self.target_index as f64 - 1.0) * ITEM_HEIGHT)
    }
}

/// 顶部空行 + 随机名字 + 中奖者 + 补位
pub fn build_reel(pool: &[String], target: &str) -> Reel {
    let mut rng = rand::thread_rng();
    let mut pick = || {
        pool.choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| target.to_string())
    };

    let mut items = Vec::with_capacity(REEL_FILLER_LEN + REEL_TRAILING_LEN + 2);
    items.push(String::new());
    for _ in 0..REEL_FILLER_LEN {
        items.push(pick());
    }
    items.push(target.to_string());
    let target_index = items.len() - 1;
    for _ in 0..REEL_TRAILING_LEN {
        items.push(pick());
    }

    Reel {
        items,
        target_index,
    }
}

/// cubic-bezier(0.25, 1, 0.5, 1)：输入时间进度，输出位移进度
pub fn ease_out(progress: f64) -> f64 {
    const X1: f64 = 0.25;
    const Y1: f64 = 1.0;
    const X2: f64 = 0.5;
    const Y2: f64 = 1.0;

    fn bezier(t: f64, p1: f64, p2: f64) -> f64 {
        let u = 1.0 - t;
        3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t
    }

    fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
        let u = 1.0 - t;
        3.0 * u * u * p1 + 6.0 * u * t * (p2 - p1) + 3.0 * t * t * (1.0 - p2)
    }

    let x = progress.clamp(0.0, 1.0);
    if x == 0.0 || x == 1.0 {
        return x;
    }

    // 牛顿迭代，斜率过小时退回二分
    let mut t = x;
    for _ in 0..8 {
        let err = bezier(t, X1, X2) - x;
        if err.abs() < 1e-7 {
            return bezier(t, Y1, Y2);
        }
        let slope = bezier_slope(t, X1, X2);
        if slope.abs() < 1e-6 {
            break;
        }
        t -= err / slope;
    }

    let (mut lo, mut hi) = (0.0, 1.0);
    t = x;
    for _ in 0..40 {
        let value = bezier(t, X1, X2);
        if (value - x).abs() < 1e-7 {
            break;
        }
        if value < x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) / 2.0;
    }
    bezier(t, Y1, Y2)
}

/// 动画进行到 elapsed_ms 时滚轮的位移
pub fn reel_offset(reel: &Reel, elapsed_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return reel.target_offset();
    }
    let progress = elapsed_ms as f64 / duration_ms as f64;
    reel.target_offset() * ease_out(progress)
}

/// 通过事件总线驱动展示屏的滚轮
pub struct ReelAnimator {
    state: Arc<Mutex<AnimatorState>>,
    closed: Arc<AtomicBool>,
    events: DrawEventBus,
    config: DrawConfig,
}

impl ReelAnimator {
    pub fn new(events: DrawEventBus, config: DrawConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(AnimatorState::Idle)),
            closed: Arc::new(AtomicBool::new(false)),
            events,
            config,
        }
    }

    /// 关闭展示（例如停机），进行中的动画不会再落定
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn set_state(state: &Mutex<AnimatorState>, next: AnimatorState) {
        *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl RevealAnimator for ReelAnimator {
    fn animate(&self, target: String, pool: Vec<String>) -> Result<SettleHandle, AnimatorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AnimatorError::Unavailable);
        }
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != AnimatorState::Idle {
                return Err(AnimatorError::Busy);
            }
            *state = AnimatorState::Spinning;
        }

        let reel = build_reel(&pool, &target);
        let (tx, rx) = oneshot::channel();
        let state = self.state.clone();
        let closed = self.closed.clone();
        let events = self.events.clone();
        let spin = self.config.spin_duration();
        let hold = self.config.settle_hold();
        let duration_ms = self.config.spin_duration_ms;

        tokio::spawn(async move {
            events.publish(DrawEvent::ReelSpinning {
                items: reel.items,
                target_index: reel.target_index,
                item_height: ITEM_HEIGHT,
                duration_ms,
                easing: REEL_EASING.to_string(),
            });
            tokio::time::sleep(spin).await;

            Self::set_state(&state, AnimatorState::Settled);
            events.publish(DrawEvent::ReelSettled {
                winner: target.clone(),
            });
            tokio::time::sleep(hold).await;
            Self::set_state(&state, AnimatorState::Idle);

            if closed.load(Ordering::SeqCst) {
                log::warn!("Reel closed before settling on {target}");
                return;
            }
            if tx.send(target).is_err() {
                log::debug!("Settle receiver dropped before the reel stopped");
            }
        });

        Ok(SettleHandle::new(rx))
    }

    fn state(&self) -> AnimatorState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

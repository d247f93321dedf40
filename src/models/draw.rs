use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Reward;
use crate::entities::DrawMode;

/// 抽奖被直接跳过的原因（不是错误）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReason {
    /// 奖项没有剩余名额
    NoRemainingQuantity,
    /// 没有可抽的参与者
    NoEligibleParticipants,
    /// 已有抽奖在进行
    DrawInProgress,
    /// 滚轮正在转动
    AnimatorBusy,
}

/// 动画期间状态被改变，本步放弃
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RaceLostReason {
    /// 奖项名额已用完
    QuotaExhausted,
    /// 该参与者已在其它奖项中奖
    AlreadyWon,
    /// 奖项已被删除
    RewardRemoved,
}

/// 单步抽奖结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Won { winner: String, reward: Reward },
    Declined(DeclineReason),
    RaceLost { winner: String, reason: RaceLostReason },
}

/// 抽奖序列的结束原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawStop {
    /// 计划的步数全部完成
    Completed,
    /// 开始前即被跳过
    Declined { reason: DeclineReason },
    /// 动画结束后发现状态已变化：单抽未记录中奖人，或连抽因此少于计划人数
    RaceLost { reason: RaceLostReason },
    /// 连抽途中名额用尽
    QuotaExhausted,
    /// 连抽途中可抽人数用尽
    PoolExhausted,
    /// 写入失败，序列中止
    PersistenceFailed { message: String },
    /// 滚轮不可用，序列中止
    AnimatorUnavailable,
    /// 奖项在抽奖途中被删除
    RewardRemoved,
}

/// 一次抽奖（单抽或连抽）的汇总
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawReport {
    pub reward_id: String,
    pub mode: DrawMode,
    /// 序列开始时计划抽取的人数
    pub planned: usize,
    /// 本次成功写入的中奖者（按顺序）
    pub winners: Vec<String>,
    pub stop: DrawStop,
    /// 动画期间状态被改变的提示
    pub warnings: Vec<String>,
}

impl DrawReport {
    pub fn new(reward_id: &str, mode: DrawMode, planned: usize) -> Self {
        Self {
            reward_id: reward_id.to_string(),
            mode,
            planned,
            winners: Vec::new(),
            stop: DrawStop::Completed,
            warnings: Vec::new(),
        }
    }

    pub fn declined(reward_id: &str, mode: DrawMode, reason: DeclineReason) -> Self {
        let mut report = Self::new(reward_id, mode, 0);
        report.stop = DrawStop::Declined { reason };
        report
    }

    pub fn persistence_failure(&self) -> Option<&str> {
        match &self.stop {
            DrawStop::PersistenceFailed { message } => Some(message),
            _ => None,
        }
    }
}

/// 抽奖开始前的预检结果
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawPlan {
    pub reward_id: String,
    pub mode: DrawMode,
    /// 计划抽取人数，为 0 时 declined 给出原因
    pub planned: usize,
    pub eligible: usize,
    pub declined: Option<DeclineReason>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DrawQuery {
    /// 为 true 时等待抽奖完成后返回结果
    pub wait: Option<bool>,
}

/// 滚轮状态：Idle -> Spinning -> Settled -> Idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnimatorState {
    Idle,
    Spinning,
    Settled,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawStatusResponse {
    pub animator: AnimatorState,
    pub drawing: bool,
    pub participant_count: usize,
    pub eligible_count: usize,
}

/// 推送给展示屏的事件
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawEvent {
    SequenceStarted {
        reward_id: String,
        mode: DrawMode,
        planned: usize,
    },
    /// 滚轮开始转动；items[target_index] 为中奖者
    ReelSpinning {
        items: Vec<String>,
        target_index: usize,
        item_height: f64,
        duration_ms: u64,
        easing: String,
    },
    ReelSettled {
        winner: String,
    },
    WinnerPersisted {
        reward_id: String,
        winner: String,
        remaining_quantity: i64,
    },
    /// 连抽中间的中奖者：只播放音效/彩带
    WinnerCue {
        reward_id: String,
        winner: String,
    },
    Congratulation {
        reward_id: String,
        reward_name: String,
        winner: String,
    },
    Warning {
        message: String,
    },
    Error {
        message: String,
    },
    SequenceFinished {
        reward_id: String,
        winners: Vec<String>,
        stop: DrawStop,
    },
}

impl DrawEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DrawEvent::SequenceStarted { .. } => "sequence_started",
            DrawEvent::ReelSpinning { .. } => "reel_spinning",
            DrawEvent::ReelSettled { .. } => "reel_settled",
            DrawEvent::WinnerPersisted { .. } => "winner_persisted",
            DrawEvent::WinnerCue { .. } => "winner_cue",
            DrawEvent::Congratulation { .. } => "congratulation",
            DrawEvent::Warning { .. } => "warning",
            DrawEvent::Error { .. } => "error",
            DrawEvent::SequenceFinished { .. } => "sequence_finished",
        }
    }

    /// 编码为一帧 server-sent event
    pub fn to_sse_frame(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("event: {}\ndata: {}\n\n", self.name(), data)
    }
}

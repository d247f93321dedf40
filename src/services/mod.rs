pub mod animator;
pub mod draw_engine;
pub mod draw_events;
pub mod export_service;
pub mod participant_service;
pub mod reward_cache;
pub mod reward_service;
pub mod reward_store;
pub mod settings_service;
pub mod upload_service;

pub use animator::{AnimatorError, ReelAnimator, RevealAnimator, SettleHandle};
pub use draw_engine::*;
pub use draw_events::DrawEventBus;
pub use export_service::*;
pub use participant_service::*;
pub use reward_cache::*;
pub use reward_service::*;
pub use reward_store::{NewReward, RewardStore, SeaOrmRewardStore};
pub use settings_service::*;
pub use upload_service::*;

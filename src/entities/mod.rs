pub mod participants;
pub mod rewards;
pub mod settings;

pub use participants as participant_entity;
pub use rewards as reward_entity;
pub use rewards::WinnerList;
pub use settings as settings_entity;
pub use settings::DrawMode;

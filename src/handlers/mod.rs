pub mod draw;
pub mod export;
pub mod participant;
pub mod reward;
pub mod settings;
pub mod upload;

pub use draw::draw_config;
pub use export::export_config;
pub use participant::participant_config;
pub use reward::reward_config;
pub use settings::settings_config;
pub use upload::upload_config;

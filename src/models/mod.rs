pub mod common;
pub mod draw;
pub mod participant;
pub mod reward;
pub mod settings;
pub mod upload;

pub use common::*;
pub use draw::*;
pub use participant::*;
pub use reward::*;
pub use settings::*;
pub use upload::*;

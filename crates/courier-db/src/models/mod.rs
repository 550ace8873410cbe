//! Database models - SQLx-compatible structs for PostgreSQL tables

mod session;
mod settings;
mod task;

pub use session::SessionModel;
pub use settings::FeedbackSettingsModel;
pub use task::{FeedbackTaskModel, StatusCountModel};

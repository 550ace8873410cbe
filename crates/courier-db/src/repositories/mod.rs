//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in courier-core.

mod error;
mod session;
mod settings;
mod task;

pub use session::PgSessionRepository;
pub use settings::PgFeedbackSettingsRepository;
pub use task::PgFeedbackTaskRepository;

//! Domain entities - core business objects

mod session;
mod settings;
mod task;

pub use session::{SessionStatus, TenantSession};
pub use settings::{FeedbackSettings, Verdict};
pub use task::{FeedbackTask, NewFeedbackTask, TaskStats, TaskStatus};

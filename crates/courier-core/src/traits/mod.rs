//! Domain traits (ports)

mod repositories;

pub use repositories::{
    FeedbackSettingsRepository, FeedbackTaskRepository, RepoResult, SessionRepository,
};

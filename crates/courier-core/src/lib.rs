//! # courier-core
//!
//! Domain layer containing entities, value objects, repository traits, and inbound events
//! for the messaging session and feedback-automation core.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    FeedbackSettings, FeedbackTask, NewFeedbackTask, SessionStatus, TaskStats, TaskStatus,
    TenantSession, Verdict,
};
pub use error::DomainError;
pub use events::{InboundEvent, InboundPayload};
pub use traits::{FeedbackSettingsRepository, FeedbackTaskRepository, RepoResult, SessionRepository};
pub use value_objects::{PhoneNumber, PhoneParseError, StoreId, StoreIdParseError};

//! # courier-service
//!
//! Application layer: the feedback scheduler, the reply classifier, the
//! enqueue/settings use cases and the DTOs exposed over HTTP.

pub mod classifier;
pub mod dto;
pub mod scheduler;
pub mod services;

pub use classifier::{IgnoreReason, ReplyClassifier, ReplyOutcome};
pub use scheduler::{DispatchReport, FeedbackScheduler};
pub use services::{
    FeedbackService, MessageSender, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult, SessionService,
};

//! Data transfer objects for API requests and responses
//!
//! - Request DTOs with validation for API inputs
//! - Response DTOs for serializing API outputs

pub mod requests;
pub mod responses;

pub use requests::{
    EnqueueFeedbackRequest, InboundWebhookPayload, PollVotePayload, SendTestMessageRequest,
    UpdateFeedbackSettingsRequest,
};
pub use responses::{
    ApiResponse, EnqueueResponse, FeedbackSettingsResponse, FeedbackStatsResponse,
    FeedbackTaskResponse, HealthChecks, HealthResponse, ReadinessResponse, SessionStatusResponse,
    TestMessageResponse,
};

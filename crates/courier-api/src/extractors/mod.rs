//! Axum extractors for request handling
//!
//! Custom extractors for authentication, validation, and path parameters.

mod auth;
mod path;
mod validated;

pub use auth::{ApiKey, WebhookSecret, WEBHOOK_SECRET_HEADER};
pub use path::StorePath;
pub use validated::ValidatedJson;

//! Feedback settings database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for feedback_settings table
#[derive(Debug, Clone, FromRow)]
pub struct FeedbackSettingsModel {
    pub store_id: i64,
    pub enabled: bool,
    pub delay_minutes: i32,
    pub poll_question: String,
    pub good_option: String,
    pub bad_option: String,
    pub good_response: String,
    pub bad_response: String,
    pub review_message: String,
    pub expire_hours: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//! Feedback task database models

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;

/// Database model for feedback_tasks table
#[derive(Debug, Clone, FromRow)]
pub struct FeedbackTaskModel {
    pub id: i64,
    pub store_id: i64,
    pub order_id: String,
    pub customer_phone: String,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub poll_message_id: Option<String>,
    pub poll_sent_at: Option<DateTime<Utc>>,
    pub review_links: Json<Vec<String>>,
    pub review_links_sent: bool,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the per-status count query
#[derive(Debug, Clone, FromRow)]
pub struct StatusCountModel {
    pub status: String,
    pub count: i64,
    pub review_links_sent: i64,
}

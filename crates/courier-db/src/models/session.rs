//! Messaging session database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for messaging_sessions table
#[derive(Debug, Clone, FromRow)]
pub struct SessionModel {
    pub store_id: i64,
    pub status: String,
    pub credentials: Option<serde_json::Value>,
    pub is_connected: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}


//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output.
//! Store ids are serialized as strings for JavaScript compatibility.

use chrono::{DateTime, Utc};
use courier_core::{FeedbackSettings, FeedbackTask, SessionStatus, StoreId, TaskStats, TaskStatus};
use serde::Serialize;

// ============================================================================
// Common Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Feedback Responses
// ============================================================================

/// Feedback settings of a store
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackSettingsResponse {
    pub store_id: StoreId,
    pub enabled: bool,
    pub delay_minutes: i32,
    pub poll_question: String,
    pub good_option: String,
    pub bad_option: String,
    pub good_response: String,
    pub bad_response: String,
    pub review_message: String,
    pub expire_hours: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<FeedbackSettings> for FeedbackSettingsResponse {
    fn from(s: FeedbackSettings) -> Self {
        Self {
            store_id: s.store_id,
            enabled: s.enabled,
            delay_minutes: s.delay_minutes,
            poll_question: s.poll_question,
            good_option: s.good_option,
            bad_option: s.bad_option,
            good_response: s.good_response,
            bad_response: s.bad_response,
            review_message: s.review_message,
            expire_hours: s.expire_hours,
            updated_at: s.updated_at,
        }
    }
}

/// A feedback task
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackTaskResponse {
    pub id: i64,
    pub store_id: StoreId,
    pub order_id: String,
    pub customer_phone: String,
    pub status: TaskStatus,
    pub scheduled_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_sent_at: Option<DateTime<Utc>>,
    pub review_links_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl From<FeedbackTask> for FeedbackTaskResponse {
    fn from(t: FeedbackTask) -> Self {
        Self {
            id: t.id,
            store_id: t.store_id,
            order_id: t.order_id,
            customer_phone: t.customer_phone.into(),
            status: t.status,
            scheduled_at: t.scheduled_at,
            poll_sent_at: t.poll_sent_at,
            review_links_sent: t.review_links_sent,
            created_at: t.created_at,
        }
    }
}

/// Result of an enqueue call; `task` is absent for a duplicate order
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueResponse {
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<FeedbackTaskResponse>,
}

impl From<Option<FeedbackTask>> for EnqueueResponse {
    fn from(task: Option<FeedbackTask>) -> Self {
        Self {
            created: task.is_some(),
            task: task.map(FeedbackTaskResponse::from),
        }
    }
}

/// Task counters of a store
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStatsResponse {
    pub store_id: StoreId,
    #[serde(flatten)]
    pub counts: TaskStats,
    pub total: i64,
}

impl FeedbackStatsResponse {
    pub fn new(store_id: StoreId, counts: TaskStats) -> Self {
        Self {
            store_id,
            total: counts.total(),
            counts,
        }
    }
}

// ============================================================================
// Session Responses
// ============================================================================

/// Messaging session state for the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusResponse {
    pub store_id: StoreId,
    /// Live state, or `offline` when the messaging bridge is unreachable
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr: Option<String>,
    pub is_connected: bool,
    /// Last state written to the database
    pub persisted_status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Provider id of a sent test message
#[derive(Debug, Clone, Serialize)]
pub struct TestMessageResponse {
    pub message_id: String,
}

// ============================================================================
// Health Responses
// ============================================================================

/// Liveness response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness response with per-dependency checks
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: HealthChecks,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: bool,
    pub messaging_bridge: bool,
    pub live_sessions: usize,
}

impl ReadinessResponse {
    /// Ready as long as the database answers; the bridge is reported but not required
    pub fn from_checks(checks: HealthChecks) -> Self {
        Self {
            status: if checks.database { "ready" } else { "not_ready" },
            checks,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.checks.database
    }
}

//! Feedback task entity - one queued satisfaction poll per (order, customer)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::{PhoneNumber, StoreId};

/// Lifecycle state of a feedback task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for `scheduled_at`
    Pending,
    /// Claimed by a dispatch tick, poll not yet confirmed sent
    Sending,
    /// Poll delivered, waiting for the customer's answer
    PollSent,
    Positive,
    Negative,
    Expired,
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 7] = [
        Self::Pending,
        Self::Sending,
        Self::PollSent,
        Self::Positive,
        Self::Negative,
        Self::Expired,
        Self::Failed,
    ];

    /// Database / wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::PollSent => "poll_sent",
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }

    /// Parse from the database representation
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Terminal states are never left once entered
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Positive | Self::Negative | Self::Expired | Self::Failed
        )
    }

    /// Check whether the workflow allows moving from `self` to `next`
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Sending) => true,
            (Self::Sending, Self::PollSent | Self::Expired | Self::Failed | Self::Pending) => true,
            (Self::PollSent, Self::Positive | Self::Negative | Self::Expired) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feedback task entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackTask {
    pub id: i64,
    pub store_id: StoreId,
    pub order_id: String,
    pub customer_phone: PhoneNumber,
    pub status: TaskStatus,
    pub scheduled_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub poll_message_id: Option<String>,
    pub poll_sent_at: Option<DateTime<Utc>>,
    pub review_links: Vec<String>,
    pub review_links_sent: bool,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedbackTask {
    /// Check if the task is due for dispatch at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending && self.scheduled_at <= now
    }

    /// Check if the poll went unanswered for longer than `expire_hours`
    pub fn is_poll_stale(&self, now: DateTime<Utc>, expire_hours: i32) -> bool {
        self.status == TaskStatus::PollSent
            && self
                .poll_sent_at
                .is_some_and(|sent| sent < now - Duration::hours(i64::from(expire_hours)))
    }
}

/// Values needed to enqueue a new feedback task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedbackTask {
    pub store_id: StoreId,
    pub order_id: String,
    pub customer_phone: PhoneNumber,
    pub scheduled_at: DateTime<Utc>,
    pub review_links: Vec<String>,
}

impl NewFeedbackTask {
    /// Build a task scheduled `delay_minutes` after `now`
    pub fn scheduled(
        store_id: StoreId,
        order_id: String,
        customer_phone: PhoneNumber,
        review_links: Vec<String>,
        now: DateTime<Utc>,
        delay_minutes: i32,
    ) -> Self {
        Self {
            store_id,
            order_id,
            customer_phone,
            scheduled_at: now + Duration::minutes(i64::from(delay_minutes.max(0))),
            review_links,
        }
    }
}

/// Per-store task counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub pending: i64,
    pub sending: i64,
    pub poll_sent: i64,
    pub positive: i64,
    pub negative: i64,
    pub expired: i64,
    pub failed: i64,
    pub review_links_sent: i64,
}

impl TaskStats {
    /// Add `count` rows of `status`
    pub fn record(&mut self, status: TaskStatus, count: i64) {
        let slot = match status {
            TaskStatus::Pending => &mut self.pending,
            TaskStatus::Sending => &mut self.sending,
            TaskStatus::PollSent => &mut self.poll_sent,
            TaskStatus::Positive => &mut self.positive,
            TaskStatus::Negative => &mut self.negative,
            TaskStatus::Expired => &mut self.expired,
            TaskStatus::Failed => &mut self.failed,
        };
        *slot += count;
    }

    pub fn total(&self) -> i64 {
        self.pending
            + self.sending
            + self.poll_sent
            + self.positive
            + self.negative
            + self.expired
            + self.failed
    }
}

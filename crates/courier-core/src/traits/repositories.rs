//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Every status change on a feedback task is a
//! conditional update on the expected current status, so callers learn from
//! the returned `bool` whether they won the transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    FeedbackSettings, FeedbackTask, NewFeedbackTask, SessionStatus, TaskStats, TaskStatus,
    TenantSession,
};
use crate::error::DomainError;
use crate::value_objects::{PhoneNumber, StoreId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Feedback Settings Repository
// ============================================================================

#[async_trait]
pub trait FeedbackSettingsRepository: Send + Sync {
    /// Find settings for a store without creating them
    async fn find(&self, store_id: StoreId) -> RepoResult<Option<FeedbackSettings>>;

    /// Get settings, inserting defaults on first access
    async fn get_or_create(&self, store_id: StoreId) -> RepoResult<FeedbackSettings>;

    /// Insert or replace settings
    async fn upsert(&self, settings: &FeedbackSettings) -> RepoResult<FeedbackSettings>;
}

// ============================================================================
// Feedback Task Repository
// ============================================================================

#[async_trait]
pub trait FeedbackTaskRepository: Send + Sync {
    /// Insert a pending task; `None` when the (store, order, phone) task already exists
    async fn enqueue(
        &self,
        task: &NewFeedbackTask,
        now: DateTime<Utc>,
    ) -> RepoResult<Option<FeedbackTask>>;

    /// Find task by ID
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<FeedbackTask>>;

    /// Atomically claim up to `limit` due pending tasks (`pending -> sending`),
    /// returned oldest `scheduled_at` first
    async fn claim_due(&self, now: DateTime<Utc>, limit: u32) -> RepoResult<Vec<FeedbackTask>>;

    /// `sending -> poll_sent`, recording the provider message id and send time
    async fn mark_poll_sent(
        &self,
        id: i64,
        poll_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> RepoResult<bool>;

    /// `sending -> failed`, recording the error
    async fn mark_failed(&self, id: i64, error: &str, now: DateTime<Utc>) -> RepoResult<bool>;

    /// Conditional status change `from -> to`
    async fn transition(
        &self,
        id: i64,
        from: TaskStatus,
        to: TaskStatus,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;

    /// Set `review_links_sent` on a positive task that has not had it set yet
    async fn mark_review_links_sent(&self, id: i64, now: DateTime<Utc>) -> RepoResult<bool>;

    /// Expire every `poll_sent` task older than its store's expiry window.
    /// Stores without settings use `default_expire_hours`.
    async fn expire_stale_polls(
        &self,
        now: DateTime<Utc>,
        default_expire_hours: i32,
    ) -> RepoResult<u64>;

    /// Return `sending` claims older than `claimed_before` to `pending`
    async fn release_stale_claims(
        &self,
        claimed_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RepoResult<u64>;

    /// Find the open (`poll_sent`) task a reply belongs to: by poll message id when
    /// given, otherwise the most recently polled task for the phone
    async fn find_open_poll(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        poll_message_id: Option<&str>,
    ) -> RepoResult<Option<FeedbackTask>>;

    /// Count tasks per status for a store
    async fn stats(&self, store_id: StoreId) -> RepoResult<TaskStats>;
}

// ============================================================================
// Session Repository
// ============================================================================

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Find the persisted session of a store
    async fn find(&self, store_id: StoreId) -> RepoResult<Option<TenantSession>>;

    /// Sessions holding credentials that can be resumed without pairing
    async fn list_resumable(&self) -> RepoResult<Vec<TenantSession>>;

    /// Upsert status and the mirrored connectivity flag
    async fn save_status(
        &self,
        store_id: StoreId,
        status: SessionStatus,
        now: DateTime<Utc>,
    ) -> RepoResult<()>;

    /// Upsert the opaque credential blob
    async fn save_credentials(
        &self,
        store_id: StoreId,
        credentials: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> RepoResult<()>;

    /// Drop credentials and mark the session disconnected
    async fn clear(&self, store_id: StoreId, now: DateTime<Utc>) -> RepoResult<()>;
}

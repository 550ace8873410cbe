//! PostgreSQL implementation of FeedbackTaskRepository
//!
//! The dispatch claim flips due `pending` rows to `sending` in one statement
//! using `FOR UPDATE SKIP LOCKED`, so overlapping ticks never share a row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, instrument};

use courier_core::entities::{FeedbackTask, NewFeedbackTask, TaskStats, TaskStatus};
use courier_core::error::DomainError;
use courier_core::traits::{FeedbackTaskRepository, RepoResult};
use courier_core::value_objects::{PhoneNumber, StoreId};

use crate::mappers::collect_stats;
use crate::models::{FeedbackTaskModel, StatusCountModel};

use super::error::{into_tasks, map_db_error};

/// PostgreSQL implementation of FeedbackTaskRepository
#[derive(Clone)]
pub struct PgFeedbackTaskRepository {
    pool: PgPool,
}

impl PgFeedbackTaskRepository {
    /// Create a new PgFeedbackTaskRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackTaskRepository for PgFeedbackTaskRepository {
    #[instrument(skip(self, task), fields(store_id = %task.store_id, order_id = %task.order_id))]
    async fn enqueue(
        &self,
        task: &NewFeedbackTask,
        now: DateTime<Utc>,
    ) -> RepoResult<Option<FeedbackTask>> {
        let result = sqlx::query_as::<_, FeedbackTaskModel>(
            r#"
            INSERT INTO feedback_tasks (store_id, order_id, customer_phone, status, scheduled_at,
                                        review_links, created_at, updated_at)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $6)
            ON CONFLICT ON CONSTRAINT feedback_tasks_order_unique DO NOTHING
            RETURNING id, store_id, order_id, customer_phone, status, scheduled_at, claimed_at,
                      poll_message_id, poll_sent_at, review_links, review_links_sent,
                      last_error, created_at, updated_at
            "#,
        )
        .bind(task.store_id.into_inner())
        .bind(&task.order_id)
        .bind(task.customer_phone.as_str())
        .bind(task.scheduled_at)
        .bind(Json(&task.review_links))
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(FeedbackTask::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<FeedbackTask>> {
        let result = sqlx::query_as::<_, FeedbackTaskModel>(
            r#"
            SELECT id, store_id, order_id, customer_phone, status, scheduled_at, claimed_at,
                   poll_message_id, poll_sent_at, review_links, review_links_sent,
                   last_error, created_at, updated_at
            FROM feedback_tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(FeedbackTask::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn claim_due(&self, now: DateTime<Utc>, limit: u32) -> RepoResult<Vec<FeedbackTask>> {
        let rows = sqlx::query_as::<_, FeedbackTaskModel>(
            r#"
            UPDATE feedback_tasks
            SET status = 'sending', claimed_at = $1, updated_at = $1
            WHERE id IN (
                SELECT id
                FROM feedback_tasks
                WHERE status = 'pending' AND scheduled_at <= $1
                ORDER BY scheduled_at
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            AND status = 'pending'
            RETURNING id, store_id, order_id, customer_phone, status, scheduled_at, claimed_at,
                      poll_message_id, poll_sent_at, review_links, review_links_sent,
                      last_error, created_at, updated_at
            "#,
        )
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        // RETURNING order is unspecified
        let mut tasks = into_tasks(rows)?;
        tasks.sort_by_key(|t| (t.scheduled_at, t.id));

        if !tasks.is_empty() {
            debug!(count = tasks.len(), "Claimed due feedback tasks");
        }
        Ok(tasks)
    }

    #[instrument(skip(self))]
    async fn mark_poll_sent(
        &self,
        id: i64,
        poll_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE feedback_tasks
            SET status = 'poll_sent', poll_message_id = $2, poll_sent_at = $3,
                last_error = NULL, updated_at = $3
            WHERE id = $1 AND status = 'sending'
            "#,
        )
        .bind(id)
        .bind(poll_message_id)
        .bind(sent_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn mark_failed(&self, id: i64, error: &str, now: DateTime<Utc>) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE feedback_tasks
            SET status = 'failed', last_error = $2, updated_at = $3
            WHERE id = $1 AND status = 'sending'
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn transition(
        &self,
        id: i64,
        from: TaskStatus,
        to: TaskStatus,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        if !from.can_transition_to(to) {
            return Err(DomainError::InvalidTransition { from, to });
        }

        let result = sqlx::query(
            r#"
            UPDATE feedback_tasks
            SET status = $3, updated_at = $4
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn mark_review_links_sent(&self, id: i64, now: DateTime<Utc>) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE feedback_tasks
            SET review_links_sent = TRUE, updated_at = $2
            WHERE id = $1 AND status = 'positive' AND review_links_sent = FALSE
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn expire_stale_polls(
        &self,
        now: DateTime<Utc>,
        default_expire_hours: i32,
    ) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE feedback_tasks t
            SET status = 'expired', updated_at = $1
            WHERE t.status = 'poll_sent'
              AND t.poll_sent_at < $1 - make_interval(hours => COALESCE(
                    (SELECT s.expire_hours FROM feedback_settings s WHERE s.store_id = t.store_id),
                    $2))
            "#,
        )
        .bind(now)
        .bind(default_expire_hours)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn release_stale_claims(
        &self,
        claimed_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE feedback_tasks
            SET status = 'pending', claimed_at = NULL, updated_at = $2
            WHERE status = 'sending' AND claimed_at < $1
            "#,
        )
        .bind(claimed_before)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn find_open_poll(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        poll_message_id: Option<&str>,
    ) -> RepoResult<Option<FeedbackTask>> {
        let result = sqlx::query_as::<_, FeedbackTaskModel>(
            r#"
            SELECT id, store_id, order_id, customer_phone, status, scheduled_at, claimed_at,
                   poll_message_id, poll_sent_at, review_links, review_links_sent,
                   last_error, created_at, updated_at
            FROM feedback_tasks
            WHERE store_id = $1
              AND customer_phone = $2
              AND status = 'poll_sent'
              AND ($3::text IS NULL OR poll_message_id = $3)
            ORDER BY poll_sent_at DESC
            LIMIT 1
            "#,
        )
        .bind(store_id.into_inner())
        .bind(phone.as_str())
        .bind(poll_message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(FeedbackTask::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn stats(&self, store_id: StoreId) -> RepoResult<TaskStats> {
        let rows = sqlx::query_as::<_, StatusCountModel>(
            r#"
            SELECT status,
                   COUNT(*) AS count,
                   COUNT(*) FILTER (WHERE review_links_sent) AS review_links_sent
            FROM feedback_tasks
            WHERE store_id = $1
            GROUP BY status
            "#,
        )
        .bind(store_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(collect_stats(rows))
    }
}

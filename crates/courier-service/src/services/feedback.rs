//! Feedback service
//!
//! Enqueues feedback tasks for new orders and manages per-store settings.

use chrono::{DateTime, Utc};
use courier_core::{FeedbackSettings, FeedbackTask, NewFeedbackTask, PhoneNumber, StoreId, TaskStats};
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::dto::{EnqueueFeedbackRequest, UpdateFeedbackSettingsRequest};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Feedback service
pub struct FeedbackService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> FeedbackService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Schedule a feedback poll for an order; `None` when one already exists
    pub async fn enqueue(
        &self,
        store_id: StoreId,
        request: EnqueueFeedbackRequest,
    ) -> ServiceResult<Option<FeedbackTask>> {
        self.enqueue_at(store_id, request, Utc::now()).await
    }

    /// Enqueue relative to an explicit clock
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn enqueue_at(
        &self,
        store_id: StoreId,
        request: EnqueueFeedbackRequest,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<FeedbackTask>> {
        request
            .validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let phone = PhoneNumber::parse(&request.customer_phone)
            .map_err(|e| ServiceError::validation(format!("customer_phone: {e}")))?;

        // Delay is fixed at enqueue time; a disabled store still gets a row
        let delay_minutes = self
            .ctx
            .settings_repo()
            .find(store_id)
            .await?
            .map_or(FeedbackSettings::DEFAULT_DELAY_MINUTES, |s| s.delay_minutes);

        let task = NewFeedbackTask::scheduled(
            store_id,
            request.order_id,
            phone,
            request.review_links,
            now,
            delay_minutes,
        );

        let created = self.ctx.task_repo().enqueue(&task, now).await?;

        match &created {
            Some(task) => info!(
                task_id = task.id,
                %store_id,
                scheduled_at = %task.scheduled_at,
                "Feedback task enqueued"
            ),
            None => debug!(%store_id, order_id = %task.order_id, "Feedback task already exists"),
        }

        Ok(created)
    }

    /// Settings of a store, created with defaults on first access
    #[instrument(skip(self))]
    pub async fn get_settings(&self, store_id: StoreId) -> ServiceResult<FeedbackSettings> {
        Ok(self.ctx.settings_repo().get_or_create(store_id).await?)
    }

    /// Validated partial update of a store's settings
    #[instrument(skip(self, request))]
    pub async fn update_settings(
        &self,
        store_id: StoreId,
        request: UpdateFeedbackSettingsRequest,
    ) -> ServiceResult<FeedbackSettings> {
        request
            .validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        let mut settings = self.ctx.settings_repo().get_or_create(store_id).await?;
        request.apply_to(&mut settings);
        settings.validate()?;

        let saved = self.ctx.settings_repo().upsert(&settings).await?;
        info!(%store_id, enabled = saved.enabled, "Feedback settings updated");
        Ok(saved)
    }

    /// Task counters of a store
    pub async fn stats(&self, store_id: StoreId) -> ServiceResult<TaskStats> {
        Ok(self.ctx.task_repo().stats(store_id).await?)
    }
}

//! PostgreSQL implementation of FeedbackSettingsRepository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};

use courier_core::entities::FeedbackSettings;
use courier_core::traits::{FeedbackSettingsRepository, RepoResult};
use courier_core::value_objects::StoreId;

use crate::models::FeedbackSettingsModel;

use super::error::map_db_error;

/// PostgreSQL implementation of FeedbackSettingsRepository
#[derive(Clone)]
pub struct PgFeedbackSettingsRepository {
    pool: PgPool,
}

impl PgFeedbackSettingsRepository {
    /// Create a new PgFeedbackSettingsRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackSettingsRepository for PgFeedbackSettingsRepository {
    #[instrument(skip(self))]
    async fn find(&self, store_id: StoreId) -> RepoResult<Option<FeedbackSettings>> {
        let result = sqlx::query_as::<_, FeedbackSettingsModel>(
            r#"
            SELECT store_id, enabled, delay_minutes, poll_question, good_option, bad_option,
                   good_response, bad_response, review_message, expire_hours,
                   created_at, updated_at
            FROM feedback_settings
            WHERE store_id = $1
            "#,
        )
        .bind(store_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(FeedbackSettings::from))
    }

    #[instrument(skip(self))]
    async fn get_or_create(&self, store_id: StoreId) -> RepoResult<FeedbackSettings> {
        if let Some(existing) = self.find(store_id).await? {
            return Ok(existing);
        }

        let defaults = FeedbackSettings::defaults(store_id);
        // A concurrent first access may insert first; its row wins
        sqlx::query(
            r#"
            INSERT INTO feedback_settings (store_id, enabled, delay_minutes, poll_question,
                                           good_option, bad_option, good_response, bad_response,
                                           review_message, expire_hours, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            ON CONFLICT (store_id) DO NOTHING
            "#,
        )
        .bind(store_id.into_inner())
        .bind(defaults.enabled)
        .bind(defaults.delay_minutes)
        .bind(&defaults.poll_question)
        .bind(&defaults.good_option)
        .bind(&defaults.bad_option)
        .bind(&defaults.good_response)
        .bind(&defaults.bad_response)
        .bind(&defaults.review_message)
        .bind(defaults.expire_hours)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        debug!(%store_id, "Created default feedback settings");

        Ok(self.find(store_id).await?.unwrap_or(defaults))
    }

    #[instrument(skip(self, settings), fields(store_id = %settings.store_id))]
    async fn upsert(&self, settings: &FeedbackSettings) -> RepoResult<FeedbackSettings> {
        let model = sqlx::query_as::<_, FeedbackSettingsModel>(
            r#"
            INSERT INTO feedback_settings (store_id, enabled, delay_minutes, poll_question,
                                           good_option, bad_option, good_response, bad_response,
                                           review_message, expire_hours, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            ON CONFLICT (store_id) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                delay_minutes = EXCLUDED.delay_minutes,
                poll_question = EXCLUDED.poll_question,
                good_option = EXCLUDED.good_option,
                bad_option = EXCLUDED.bad_option,
                good_response = EXCLUDED.good_response,
                bad_response = EXCLUDED.bad_response,
                review_message = EXCLUDED.review_message,
                expire_hours = EXCLUDED.expire_hours,
                updated_at = EXCLUDED.updated_at
            RETURNING store_id, enabled, delay_minutes, poll_question, good_option, bad_option,
                      good_response, bad_response, review_message, expire_hours,
                      created_at, updated_at
            "#,
        )
        .bind(settings.store_id.into_inner())
        .bind(settings.enabled)
        .bind(settings.delay_minutes)
        .bind(&settings.poll_question)
        .bind(&settings.good_option)
        .bind(&settings.bad_option)
        .bind(&settings.good_response)
        .bind(&settings.bad_response)
        .bind(&settings.review_message)
        .bind(settings.expire_hours)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(model.into())
    }
}

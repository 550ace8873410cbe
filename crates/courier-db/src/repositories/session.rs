//! PostgreSQL implementation of SessionRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use courier_core::entities::{SessionStatus, TenantSession};
use courier_core::traits::{RepoResult, SessionRepository};
use courier_core::value_objects::StoreId;

use crate::models::SessionModel;

use super::error::map_db_error;

/// PostgreSQL implementation of SessionRepository
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new PgSessionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    #[instrument(skip(self))]
    async fn find(&self, store_id: StoreId) -> RepoResult<Option<TenantSession>> {
        let result = sqlx::query_as::<_, SessionModel>(
            r#"
            SELECT store_id, status, credentials, is_connected, last_seen_at, updated_at
            FROM messaging_sessions
            WHERE store_id = $1
            "#,
        )
        .bind(store_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(TenantSession::from))
    }

    #[instrument(skip(self))]
    async fn list_resumable(&self) -> RepoResult<Vec<TenantSession>> {
        let results = sqlx::query_as::<_, SessionModel>(
            r#"
            SELECT store_id, status, credentials, is_connected, last_seen_at, updated_at
            FROM messaging_sessions
            WHERE credentials IS NOT NULL AND credentials <> 'null'::jsonb
            ORDER BY store_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(TenantSession::from).collect())
    }

    #[instrument(skip(self))]
    async fn save_status(
        &self,
        store_id: StoreId,
        status: SessionStatus,
        now: DateTime<Utc>,
    ) -> RepoResult<()> {
        let connected = status.is_connected();
        sqlx::query(
            r#"
            INSERT INTO messaging_sessions (store_id, status, is_connected, last_seen_at, updated_at)
            VALUES ($1, $2, $3, CASE WHEN $3 THEN $4 END, $4)
            ON CONFLICT (store_id) DO UPDATE SET
                status = EXCLUDED.status,
                is_connected = EXCLUDED.is_connected,
                last_seen_at = COALESCE(EXCLUDED.last_seen_at, messaging_sessions.last_seen_at),
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(store_id.into_inner())
        .bind(status.as_str())
        .bind(connected)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, credentials))]
    async fn save_credentials(
        &self,
        store_id: StoreId,
        credentials: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messaging_sessions (store_id, status, credentials, updated_at)
            VALUES ($1, 'disconnected', $2, $3)
            ON CONFLICT (store_id) DO UPDATE SET
                credentials = EXCLUDED.credentials,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(store_id.into_inner())
        .bind(credentials)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self, store_id: StoreId, now: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messaging_sessions (store_id, status, credentials, is_connected, updated_at)
            VALUES ($1, 'disconnected', NULL, FALSE, $2)
            ON CONFLICT (store_id) DO UPDATE SET
                status = 'disconnected',
                credentials = NULL,
                is_connected = FALSE,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(store_id.into_inner())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}

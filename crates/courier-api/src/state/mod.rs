//! Application state
//!
//! Holds the shared state for the Axum application: the service context,
//! the session manager, the reply classifier and configuration.

use std::sync::Arc;

use courier_common::AppConfig;
use courier_db::PgPool;
use courier_service::{ReplyClassifier, ServiceContext};
use courier_session::SessionManager;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    service_context: ServiceContext,
    sessions: Arc<SessionManager>,
    classifier: Arc<ReplyClassifier>,
    pool: PgPool,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        service_context: ServiceContext,
        sessions: Arc<SessionManager>,
        classifier: Arc<ReplyClassifier>,
        pool: PgPool,
        config: AppConfig,
    ) -> Self {
        Self {
            service_context,
            sessions,
            classifier,
            pool,
            config: Arc::new(config),
        }
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn classifier(&self) -> &ReplyClassifier {
        &self.classifier
    }

    /// Pool used by the readiness probe
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions)
            .field("config", &"AppConfig")
            .finish_non_exhaustive()
    }
}

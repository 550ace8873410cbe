//! Session service
//!
//! Dashboard-facing session operations. Status reads fall back to the
//! persisted connectivity flag when the messaging bridge is offline.

use courier_core::{PhoneNumber, SessionRepository, SessionStatus, StoreId};
use courier_session::{ReportedState, SessionManager};
use tracing::{info, instrument};
use validator::Validate;

use crate::dto::{SendTestMessageRequest, SessionStatusResponse, TestMessageResponse};

use super::error::{ServiceError, ServiceResult};

/// Session service
pub struct SessionService<'a> {
    manager: &'a SessionManager,
    repo: &'a dyn SessionRepository,
}

impl<'a> SessionService<'a> {
    pub fn new(manager: &'a SessionManager, repo: &'a dyn SessionRepository) -> Self {
        Self { manager, repo }
    }

    /// Start pairing (or return the live session's state)
    #[instrument(skip(self))]
    pub async fn start(&self, store_id: StoreId) -> ServiceResult<SessionStatusResponse> {
        let snapshot = self.manager.start_session(store_id).await;
        let persisted = self.repo.find(store_id).await?;

        Ok(SessionStatusResponse {
            store_id,
            state: snapshot.status.as_str().to_string(),
            qr: snapshot.qr,
            is_connected: snapshot.status.is_connected(),
            persisted_status: persisted.as_ref().map_or(snapshot.status, |s| s.status),
            last_seen_at: persisted.and_then(|s| s.last_seen_at),
        })
    }

    /// Current state without side effects
    #[instrument(skip(self))]
    pub async fn status(&self, store_id: StoreId) -> ServiceResult<SessionStatusResponse> {
        let report = self.manager.get_status(store_id).await;
        let persisted = self.repo.find(store_id).await?;

        let is_connected = match report.state {
            ReportedState::Session(status) => status.is_connected(),
            ReportedState::Offline => persisted.as_ref().is_some_and(|s| s.is_connected),
        };

        Ok(SessionStatusResponse {
            store_id,
            state: report.state.as_str().to_string(),
            qr: report.qr,
            is_connected,
            persisted_status: persisted
                .as_ref()
                .map_or(SessionStatus::Disconnected, |s| s.status),
            last_seen_at: persisted.and_then(|s| s.last_seen_at),
        })
    }

    #[instrument(skip(self))]
    pub async fn disconnect(&self, store_id: StoreId) -> ServiceResult<()> {
        self.manager.disconnect(store_id).await?;
        Ok(())
    }

    /// Send a free-text message to check the session end to end
    #[instrument(skip(self, request))]
    pub async fn send_test_message(
        &self,
        store_id: StoreId,
        request: SendTestMessageRequest,
    ) -> ServiceResult<TestMessageResponse> {
        request
            .validate()
            .map_err(|e| ServiceError::validation(e.to_string()))?;
        let phone = PhoneNumber::parse(&request.phone)
            .map_err(|e| ServiceError::validation(format!("phone: {e}")))?;

        let message_id = self
            .manager
            .send_message(store_id, &phone, &request.text)
            .await?;

        info!(%store_id, %message_id, "Test message sent");
        Ok(TestMessageResponse { message_id })
    }
}

//! Session manager
//!
//! Owns every live messaging session in the process, keyed by store id in a
//! `DashMap`. At most one session exists per store; a session that gave up is
//! replaced by a fresh connection attempt on the next start.

use std::sync::Arc;

use chrono::Utc;
use courier_common::SessionConfig;
use courier_core::{InboundEvent, PhoneNumber, SessionRepository, SessionStatus, StoreId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::driver::SessionDriver;
use super::session::{Session, SessionSnapshot};
use crate::error::{SessionError, SessionResult};
use crate::transport::{MessagingTransport, PollRequest};

/// Lifecycle state as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedState {
    Session(SessionStatus),
    /// The messaging bridge could not be reached
    Offline,
}

impl ReportedState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Session(status) => status.as_str(),
            Self::Offline => "offline",
        }
    }
}

impl Serialize for ReportedState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of a status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub state: ReportedState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr: Option<String>,
}

/// Manages all per-store messaging sessions
pub struct SessionManager {
    sessions: Arc<DashMap<StoreId, Arc<Session>>>,
    transport: Arc<dyn MessagingTransport>,
    repo: Arc<dyn SessionRepository>,
    inbound: mpsc::Sender<InboundEvent>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn MessagingTransport>,
        repo: Arc<dyn SessionRepository>,
        inbound: mpsc::Sender<InboundEvent>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            transport,
            repo,
            inbound,
            config,
        }
    }

    /// Start (or return) the store's session
    ///
    /// A fresh session waits up to `qr_wait` for its first state change so the
    /// caller usually gets the QR code in the same response.
    #[instrument(skip(self))]
    pub async fn start_session(&self, store_id: StoreId) -> SessionSnapshot {
        let (session, fresh) = self.get_or_insert(store_id);

        if !fresh {
            return session.snapshot();
        }

        self.spawn_driver(&session);

        let mut rx = session.subscribe();
        let timed_out = tokio::time::timeout(
            self.config.qr_wait(),
            rx.wait_for(|s| s.status != SessionStatus::Connecting),
        )
        .await
        .is_err();
        if timed_out {
            debug!(%store_id, "No session state change within QR wait");
        }

        session.snapshot()
    }

    /// Atomically find the live session or register a new one
    fn get_or_insert(&self, store_id: StoreId) -> (Arc<Session>, bool) {
        match self.sessions.entry(store_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().status() == SessionStatus::Disconnected {
                    let session = Session::new(store_id);
                    let stale = entry.insert(session.clone());
                    stale.abort_driver();
                    (session, true)
                } else {
                    (entry.get().clone(), false)
                }
            }
            Entry::Vacant(entry) => {
                let session = Session::new(store_id);
                entry.insert(session.clone());
                (session, true)
            }
        }
    }

    fn spawn_driver(&self, session: &Arc<Session>) {
        let driver = SessionDriver {
            session: session.clone(),
            registry: self.sessions.clone(),
            transport: self.transport.clone(),
            repo: self.repo.clone(),
            inbound: self.inbound.clone(),
            config: self.config.clone(),
        };
        session.attach_driver(tokio::spawn(driver.run()));

        debug!(store_id = %session.store_id(), generation = %session.generation(), "Session driver spawned");
    }

    /// Current lifecycle state, `Offline` when the bridge is unreachable
    #[instrument(skip(self))]
    pub async fn get_status(&self, store_id: StoreId) -> StatusReport {
        if let Err(e) = self.transport.health().await {
            debug!(%store_id, error = %e, "Messaging bridge unreachable");
            return StatusReport {
                state: ReportedState::Offline,
                qr: None,
            };
        }

        let snapshot = self
            .sessions
            .get(&store_id)
            .map(|s| s.snapshot())
            .unwrap_or_default();

        StatusReport {
            state: ReportedState::Session(snapshot.status),
            qr: snapshot.qr,
        }
    }

    /// Send a text message through the store's connected session
    pub async fn send_message(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        text: &str,
    ) -> SessionResult<String> {
        self.send_message_keyed(store_id, phone, text, &Uuid::new_v4().to_string())
            .await
    }

    /// Send a text message with a caller-chosen idempotency key
    #[instrument(skip(self, text))]
    pub async fn send_message_keyed(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        text: &str,
        idempotency_key: &str,
    ) -> SessionResult<String> {
        self.ensure_connected(store_id)?;
        let id = self
            .transport
            .send_text(store_id, phone, text, idempotency_key)
            .await?;
        debug!(%store_id, message_id = %id, "Message sent");
        Ok(id)
    }

    /// Send a two-option single-choice poll
    pub async fn send_poll(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        question: &str,
        options: &[String],
    ) -> SessionResult<String> {
        self.send_poll_keyed(store_id, phone, question, options, &Uuid::new_v4().to_string())
            .await
    }

    /// Send a poll with a caller-chosen idempotency key
    #[instrument(skip(self, question, options))]
    pub async fn send_poll_keyed(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        question: &str,
        options: &[String],
        idempotency_key: &str,
    ) -> SessionResult<String> {
        let poll = build_poll(question, options)?;
        self.ensure_connected(store_id)?;
        let id = self
            .transport
            .send_poll(store_id, phone, &poll, idempotency_key)
            .await?;
        debug!(%store_id, message_id = %id, "Poll sent");
        Ok(id)
    }

    fn ensure_connected(&self, store_id: StoreId) -> SessionResult<()> {
        match self.sessions.get(&store_id) {
            Some(session) if session.status().is_connected() => Ok(()),
            _ => Err(SessionError::NotConnected(store_id)),
        }
    }

    /// Stop the session, log out at the provider and forget its credentials
    #[instrument(skip(self))]
    pub async fn disconnect(&self, store_id: StoreId) -> SessionResult<()> {
        if let Some((_, session)) = self.sessions.remove(&store_id) {
            session.abort_driver();
            session.set_status(SessionStatus::Disconnected);
        }

        if let Err(e) = self.transport.logout(store_id).await {
            warn!(%store_id, error = %e, "Provider logout failed");
        }

        self.repo.clear(store_id, Utc::now()).await?;
        info!(%store_id, "Messaging session disconnected");
        Ok(())
    }

    /// Start a session for every persisted session that holds credentials
    pub async fn resume_persisted(&self) -> SessionResult<usize> {
        let stored = self.repo.list_resumable().await?;
        let mut resumed = 0;

        for row in stored {
            let (session, fresh) = self.get_or_insert(row.store_id);
            if fresh {
                self.spawn_driver(&session);
                resumed += 1;
            }
        }

        if resumed > 0 {
            info!(count = resumed, "Resumed persisted messaging sessions");
        }
        Ok(resumed)
    }

    /// Whether the messaging bridge answers its health check
    pub async fn bridge_healthy(&self) -> bool {
        self.transport.health().await.is_ok()
    }

    /// In-memory sessions and their status
    pub fn live_sessions(&self) -> Vec<(StoreId, SessionStatus)> {
        let mut live: Vec<_> = self
            .sessions
            .iter()
            .map(|r| (*r.key(), r.status()))
            .collect();
        live.sort_by_key(|(id, _)| *id);
        live
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Stop every driver without touching persisted state, so the next start resumes
    pub fn shutdown(&self) {
        for entry in self.sessions.iter() {
            entry.abort_driver();
        }
        self.sessions.clear();
    }
}

fn build_poll(question: &str, options: &[String]) -> SessionResult<PollRequest> {
    if question.trim().is_empty() {
        return Err(SessionError::InvalidPoll("question is empty".to_string()));
    }
    match options {
        [a, b] if !a.trim().is_empty() && !b.trim().is_empty() && a != b => Ok(PollRequest {
            question: question.to_string(),
            options: options.to_vec(),
        }),
        _ => Err(SessionError::InvalidPoll(
            "a poll needs exactly two distinct non-empty options".to_string(),
        )),
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

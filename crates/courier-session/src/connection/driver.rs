//! Connection driver
//!
//! One task per live session. It opens the transport, follows the pairing
//! handshake, persists every state change and reconnects with exponential
//! backoff until the session is logged out or gives up.

use std::sync::Arc;

use chrono::Utc;
use courier_common::SessionConfig;
use courier_core::{InboundEvent, SessionRepository, SessionStatus, StoreId};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use super::session::Session;
use crate::transport::{CloseReason, MessagingTransport, TransportEvent};

/// How a single transport connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Closed(CloseReason),
    PairingTimeout,
}

pub(super) struct SessionDriver {
    pub session: Arc<Session>,
    pub registry: Arc<DashMap<StoreId, Arc<Session>>>,
    pub transport: Arc<dyn MessagingTransport>,
    pub repo: Arc<dyn SessionRepository>,
    pub inbound: mpsc::Sender<InboundEvent>,
    pub config: SessionConfig,
}

impl SessionDriver {
    fn store_id(&self) -> StoreId {
        self.session.store_id()
    }

    pub async fn run(self) {
        let store_id = self.store_id();
        let mut failures = 0u32;
        self.update_status(SessionStatus::Connecting).await;

        loop {
            let credentials = match self.repo.find(store_id).await {
                Ok(stored) => stored.and_then(|s| s.credentials),
                Err(e) => {
                    warn!(%store_id, error = %e, "Failed to load session credentials");
                    None
                }
            };

            let exit = match self.transport.connect(store_id, credentials).await {
                Ok(mut events) => self.pump(&mut events, &mut failures).await,
                Err(e) => {
                    warn!(%store_id, error = %e, "Transport connect failed");
                    Exit::Closed(CloseReason::ConnectionLost)
                }
            };

            match exit {
                Exit::Closed(CloseReason::LoggedOut) => {
                    info!(%store_id, "Session logged out at provider");
                    self.session.set_status(SessionStatus::Disconnected);
                    if let Err(e) = self.repo.clear(store_id, Utc::now()).await {
                        warn!(%store_id, error = %e, "Failed to clear session credentials");
                    }
                    break;
                }
                Exit::Closed(CloseReason::PairingFailed) | Exit::PairingTimeout => {
                    info!(%store_id, reason = ?exit, "Pairing did not complete");
                    self.update_status(SessionStatus::Disconnected).await;
                    break;
                }
                Exit::Closed(CloseReason::ConnectionLost) => {
                    failures += 1;
                    if failures > self.config.max_reconnect_attempts {
                        warn!(%store_id, failures, "Giving up reconnecting; manual re-pairing required");
                        self.update_status(SessionStatus::Disconnected).await;
                        break;
                    }
                    let delay = self.config.reconnect_delay(failures);
                    debug!(%store_id, attempt = failures, ?delay, "Reconnecting after backoff");
                    self.update_status(SessionStatus::Connecting).await;
                    tokio::time::sleep(delay).await;
                }
            }
        }

        let generation = self.session.generation();
        self.registry.remove_if(&store_id, |_, s| s.generation() == generation);
        debug!(%store_id, "Session driver finished");
    }

    /// Follow one transport connection until it ends
    async fn pump(
        &self,
        events: &mut mpsc::Receiver<TransportEvent>,
        failures: &mut u32,
    ) -> Exit {
        let store_id = self.store_id();
        let pairing_deadline = Instant::now() + self.config.pairing_timeout();
        let mut connected = false;

        loop {
            let next = if connected {
                events.recv().await
            } else {
                match timeout_at(pairing_deadline, events.recv()).await {
                    Ok(event) => event,
                    Err(_) => return Exit::PairingTimeout,
                }
            };

            let Some(event) = next else {
                return Exit::Closed(CloseReason::ConnectionLost);
            };

            match event {
                TransportEvent::Qr(qr) => {
                    debug!(%store_id, "QR code issued");
                    self.session.set_qr(qr);
                    self.persist_status(SessionStatus::QrPending).await;
                }
                TransportEvent::Connected { credentials } => {
                    connected = true;
                    *failures = 0;
                    if let Some(credentials) = credentials {
                        self.persist_credentials(&credentials).await;
                    }
                    info!(%store_id, "Messaging session connected");
                    self.update_status(SessionStatus::Connected).await;
                }
                TransportEvent::CredentialsUpdated(credentials) => {
                    self.persist_credentials(&credentials).await;
                }
                TransportEvent::Inbound(event) => {
                    if self.inbound.send(event).await.is_err() {
                        warn!(%store_id, "Inbound event channel closed; dropping reply");
                    }
                }
                TransportEvent::Closed { reason } => return Exit::Closed(reason),
            }
        }
    }

    async fn update_status(&self, status: SessionStatus) {
        self.session.set_status(status);
        self.persist_status(status).await;
    }

    async fn persist_status(&self, status: SessionStatus) {
        let store_id = self.store_id();
        if let Err(e) = self.repo.save_status(store_id, status, Utc::now()).await {
            warn!(%store_id, %status, error = %e, "Failed to persist session status");
        }
    }

    async fn persist_credentials(&self, credentials: &serde_json::Value) {
        let store_id = self.store_id();
        if let Err(e) = self.repo.save_credentials(store_id, credentials, Utc::now()).await {
            warn!(%store_id, error = %e, "Failed to persist session credentials");
        }
    }
}

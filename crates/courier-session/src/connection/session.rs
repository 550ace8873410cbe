//! A single live messaging session
//!
//! Holds the observable lifecycle state of one store's connection and the
//! handle of the driver task that owns the transport.

use std::sync::Arc;
use std::time::Instant;

use courier_core::{SessionStatus, StoreId};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Point-in-time view of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    /// QR code to scan while pairing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr: Option<String>,
}

/// A live session entry in the registry
pub struct Session {
    store_id: StoreId,
    /// Identifies this connection attempt so a finished driver only removes its own entry
    generation: Uuid,
    state: watch::Sender<SessionSnapshot>,
    driver: Mutex<Option<JoinHandle<()>>>,
    created_at: Instant,
}

impl Session {
    pub fn new(store_id: StoreId) -> Arc<Self> {
        let (state, _) = watch::channel(SessionSnapshot {
            status: SessionStatus::Connecting,
            qr: None,
        });
        Arc::new(Self {
            store_id,
            generation: Uuid::new_v4(),
            state,
            driver: Mutex::new(None),
            created_at: Instant::now(),
        })
    }

    pub fn store_id(&self) -> StoreId {
        self.store_id
    }

    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    /// Update the status; the QR code is only kept while waiting for a scan
    pub fn set_status(&self, status: SessionStatus) {
        self.state.send_modify(|s| {
            s.status = status;
            if status != SessionStatus::QrPending {
                s.qr = None;
            }
        });
    }

    pub fn set_qr(&self, qr: String) {
        self.state.send_replace(SessionSnapshot {
            status: SessionStatus::QrPending,
            qr: Some(qr),
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn attach_driver(&self, handle: JoinHandle<()>) {
        if let Some(previous) = self.driver.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop the driver task, if still running
    pub fn abort_driver(&self) {
        if let Some(handle) = self.driver.lock().take() {
            handle.abort();
        }
    }

    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("store_id", &self.store_id)
            .field("generation", &self.generation)
            .field("status", &self.status())
            .field("age", &self.age())
            .finish()
    }
}

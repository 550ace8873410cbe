//! Messaging transport abstraction
//!
//! A transport connects a store's session to the chat provider and reports the
//! connection lifecycle as a stream of [`TransportEvent`]s.

mod bridge;

pub use bridge::HttpBridgeTransport;

use async_trait::async_trait;
use courier_core::{InboundEvent, PhoneNumber, StoreId};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

/// Lifecycle events emitted by a transport connection
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Pairing required; payload is the QR code to scan
    Qr(String),
    /// Session authenticated
    Connected {
        credentials: Option<serde_json::Value>,
    },
    /// Provider rotated the credential blob
    CredentialsUpdated(serde_json::Value),
    /// Customer message pushed by the provider
    Inbound(InboundEvent),
    /// Connection ended
    Closed { reason: CloseReason },
}

/// Why a transport connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Logged out at the provider; credentials are no longer valid
    LoggedOut,
    /// QR pairing was rejected
    PairingFailed,
    /// Unexpected drop, worth reconnecting
    ConnectionLost,
}

/// Two-option single-choice poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollRequest {
    pub question: String,
    pub options: Vec<String>,
}

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Messaging bridge unreachable: {0}")]
    Unreachable(String),

    #[error("Messaging bridge rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response from messaging bridge: {0}")]
    InvalidResponse(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Connection to the chat provider
#[async_trait]
pub trait MessagingTransport: Send + Sync + 'static {
    /// Open (or resume, when credentials are given) the store's connection
    async fn connect(
        &self,
        store_id: StoreId,
        credentials: Option<serde_json::Value>,
    ) -> TransportResult<mpsc::Receiver<TransportEvent>>;

    /// Send a text message, returning the provider message id
    async fn send_text(
        &self,
        store_id: StoreId,
        to: &PhoneNumber,
        text: &str,
        idempotency_key: &str,
    ) -> TransportResult<String>;

    /// Send a poll, returning the provider message id
    async fn send_poll(
        &self,
        store_id: StoreId,
        to: &PhoneNumber,
        poll: &PollRequest,
        idempotency_key: &str,
    ) -> TransportResult<String>;

    /// Log out and drop the provider-side session
    async fn logout(&self, store_id: StoreId) -> TransportResult<()>;

    /// Check that the provider side is reachable
    async fn health(&self) -> TransportResult<()>;
}

//! # courier-session
//!
//! Per-store messaging sessions: a registry of live sessions, the connection
//! driver that walks each session through pairing and reconnects, and the
//! transport abstraction over the provider's messaging bridge.

pub mod connection;
pub mod error;
pub mod transport;

pub use connection::{ReportedState, SessionManager, SessionSnapshot, StatusReport};
pub use error::{SessionError, SessionResult};
pub use transport::{
    CloseReason, HttpBridgeTransport, MessagingTransport, PollRequest, TransportError,
    TransportEvent, TransportResult,
};

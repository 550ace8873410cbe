//! Tenant session entity - persisted state of a store's messaging session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::StoreId;

/// Connection lifecycle of a messaging session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    QrPending,
    Connected,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::QrPending => "qr_pending",
            Self::Connected => "connected",
        }
    }

    /// Parse from the database representation; unknown values read as disconnected
    pub fn parse(s: &str) -> Self {
        match s {
            "connecting" => Self::Connecting,
            "qr_pending" => Self::QrPending,
            "connected" => Self::Connected,
            _ => Self::Disconnected,
        }
    }

    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Connecting or waiting for the QR code to be scanned
    pub fn is_pairing(self) -> bool {
        matches!(self, Self::Connecting | Self::QrPending)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted session row
#[derive(Debug, Clone, PartialEq)]
pub struct TenantSession {
    pub store_id: StoreId,
    pub status: SessionStatus,
    /// Opaque provider credential blob
    pub credentials: Option<serde_json::Value>,
    pub is_connected: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TenantSession {
    /// A session can be resumed without re-pairing when credentials were stored
    pub fn is_resumable(&self) -> bool {
        self.credentials.as_ref().is_some_and(|c| !c.is_null())
    }
}

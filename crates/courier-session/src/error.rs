//! Session layer errors

use courier_common::AppError;
use courier_core::{DomainError, StoreId};
use thiserror::Error;

use crate::transport::TransportError;

/// Errors returned by the session manager
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No connected messaging session for store {0}")]
    NotConnected(StoreId),

    #[error("Invalid poll: {0}")]
    InvalidPoll(String),

    #[error("Messaging transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Repository(#[from] DomainError),
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotConnected(store_id) => AppError::NotConnected(store_id.to_string()),
            SessionError::InvalidPoll(msg) => AppError::Validation(msg),
            SessionError::Transport(e) => AppError::ExternalService(e.to_string()),
            SessionError::Repository(e) => AppError::Domain(e),
        }
    }
}

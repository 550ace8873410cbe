//! Authentication extractors
//!
//! Control endpoints take the configured API key as a bearer token; the
//! provider webhook sends a shared secret header instead.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::response::ApiError;
use crate::state::AppState;

/// Header carrying the webhook shared secret
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Proof that the request carried the API key
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

#[async_trait]
impl<S> FromRequestParts<S> for ApiKey
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::MissingAuth)?;

        let app_state = AppState::from_ref(state);
        if !secrets_match(bearer.token(), &app_state.config().api.api_key) {
            tracing::warn!("Rejected request with invalid API key");
            return Err(ApiError::InvalidApiKey);
        }

        Ok(ApiKey)
    }
}

/// Proof that the webhook carried the shared secret
#[derive(Debug, Clone, Copy)]
pub struct WebhookSecret;

#[async_trait]
impl<S> FromRequestParts<S> for WebhookSecret
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::MissingAuth)?;

        let app_state = AppState::from_ref(state);
        if !secrets_match(provided, &app_state.config().api.webhook_secret) {
            tracing::warn!("Rejected webhook with invalid secret");
            return Err(ApiError::InvalidWebhookSecret);
        }

        Ok(WebhookSecret)
    }
}

/// Length-independent comparison of two secrets
fn secrets_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    let mut diff = a.len() ^ b.len();
    for (i, byte) in b.iter().enumerate() {
        diff |= usize::from(a.get(i).copied().unwrap_or(0) ^ byte);
    }
    diff == 0 && !expected.is_empty()
}

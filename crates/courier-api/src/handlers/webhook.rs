//! Provider webhook
//!
//! Customer replies arrive here. Once the shared secret checks out the
//! bridge always gets a 200, so it never retries an event we chose to ignore.

use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;
use courier_service::dto::InboundWebhookPayload;
use courier_service::{IgnoreReason, ReplyOutcome};
use tracing::debug;

use crate::extractors::WebhookSecret;
use crate::state::AppState;

/// POST /webhooks/messaging
pub async fn receive_event(
    State(state): State<AppState>,
    _secret: WebhookSecret,
    body: Bytes,
) -> Json<ReplyOutcome> {
    let event = match serde_json::from_slice::<InboundWebhookPayload>(&body)
        .map_err(|e| e.to_string())
        .and_then(|payload| payload.into_event().map_err(|e| e.to_string()))
    {
        Ok(event) => event,
        Err(e) => {
            debug!(error = %e, "Ignoring malformed webhook payload");
            return Json(ReplyOutcome::ignored(IgnoreReason::InvalidPayload));
        }
    };

    Json(state.classifier().on_inbound_event(&event, Utc::now()).await)
}

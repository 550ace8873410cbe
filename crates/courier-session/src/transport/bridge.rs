//! HTTP messaging bridge transport
//!
//! The provider client runs as a sidecar that exposes sessions over HTTP. Session
//! state is polled and every observed change is turned into a [`TransportEvent`].
//! Customer replies reach the service through the webhook endpoint, not this stream.

use std::time::Duration;

use async_trait::async_trait;
use courier_common::BridgeConfig;
use courier_core::{PhoneNumber, StoreId};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    CloseReason, MessagingTransport, PollRequest, TransportError, TransportEvent, TransportResult,
};

const EVENT_BUFFER: usize = 32;
/// Consecutive failed state polls before the connection counts as lost
const MAX_POLL_FAILURES: u32 = 3;

/// Transport backed by the HTTP messaging bridge
#[derive(Clone)]
pub struct HttpBridgeTransport {
    client: Client,
    base_url: String,
    token: Option<String>,
    poll_interval: Duration,
}

impl HttpBridgeTransport {
    pub fn new(config: &BridgeConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            poll_interval: config.poll_interval(),
        })
    }

    fn session_url(&self, store_id: StoreId) -> String {
        format!("{}/sessions/{}", self.base_url, store_id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn fetch_state(&self, store_id: StoreId) -> TransportResult<BridgeSessionState> {
        let response = self
            .authorized(self.client.get(self.session_url(store_id)))
            .send()
            .await
            .map_err(unreachable)?;

        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }

    async fn post_message<T: Serialize + Sync>(
        &self,
        url: String,
        body: &T,
        idempotency_key: &str,
    ) -> TransportResult<String> {
        let response = self
            .authorized(self.client.post(url))
            .header("Idempotency-Key", idempotency_key)
            .json(body)
            .send()
            .await
            .map_err(unreachable)?;

        let sent: SentMessage = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        Ok(sent.id)
    }
}

#[async_trait]
impl MessagingTransport for HttpBridgeTransport {
    async fn connect(
        &self,
        store_id: StoreId,
        credentials: Option<serde_json::Value>,
    ) -> TransportResult<mpsc::Receiver<TransportEvent>> {
        let response = self
            .authorized(self.client.post(format!("{}/connect", self.session_url(store_id))))
            .json(&ConnectRequest { credentials })
            .send()
            .await
            .map_err(unreachable)?;
        check_status(response).await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let transport = self.clone();

        tokio::spawn(async move {
            let mut cursor = PollCursor::default();
            let mut failures = 0u32;
            let mut ticker = tokio::time::interval(transport.poll_interval);

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                let (events, finished) = match transport.fetch_state(store_id).await {
                    Ok(state) => {
                        failures = 0;
                        cursor.observe(state)
                    }
                    Err(e) => {
                        failures += 1;
                        warn!(%store_id, failures, error = %e, "Bridge state poll failed");
                        if failures >= MAX_POLL_FAILURES {
                            (
                                vec![TransportEvent::Closed {
                                    reason: CloseReason::ConnectionLost,
                                }],
                                true,
                            )
                        } else {
                            (Vec::new(), false)
                        }
                    }
                };

                for event in events {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                if finished {
                    break;
                }
            }

            debug!(%store_id, "Bridge state poller stopped");
        });

        Ok(rx)
    }

    async fn send_text(
        &self,
        store_id: StoreId,
        to: &PhoneNumber,
        text: &str,
        idempotency_key: &str,
    ) -> TransportResult<String> {
        let body = TextMessage {
            to: to.as_str(),
            text,
        };
        self.post_message(
            format!("{}/messages", self.session_url(store_id)),
            &body,
            idempotency_key,
        )
        .await
    }

    async fn send_poll(
        &self,
        store_id: StoreId,
        to: &PhoneNumber,
        poll: &PollRequest,
        idempotency_key: &str,
    ) -> TransportResult<String> {
        let body = PollMessage {
            to: to.as_str(),
            question: &poll.question,
            options: &poll.options,
            selectable_count: 1,
        };
        self.post_message(
            format!("{}/polls", self.session_url(store_id)),
            &body,
            idempotency_key,
        )
        .await
    }

    async fn logout(&self, store_id: StoreId) -> TransportResult<()> {
        let response = self
            .authorized(self.client.delete(self.session_url(store_id)))
            .send()
            .await
            .map_err(unreachable)?;

        // Already gone at the provider
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(response).await.map(|_| ())
    }

    async fn health(&self) -> TransportResult<()> {
        let response = self
            .authorized(self.client.get(format!("{}/health", self.base_url)))
            .send()
            .await
            .map_err(unreachable)?;
        check_status(response).await.map(|_| ())
    }
}

fn unreachable(e: reqwest::Error) -> TransportError {
    TransportError::Unreachable(e.to_string())
}

async fn check_status(response: Response) -> TransportResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(TransportError::Rejected {
        status: status.as_u16(),
        message,
    })
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ConnectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    credentials: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    to: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct PollMessage<'a> {
    to: &'a str,
    question: &'a str,
    options: &'a [String],
    selectable_count: u8,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

/// Session state as reported by `GET /sessions/{store}`
#[derive(Debug, Clone, Deserialize)]
struct BridgeSessionState {
    state: String,
    #[serde(default)]
    qr: Option<String>,
    #[serde(default)]
    credentials: Option<serde_json::Value>,
    #[serde(default)]
    reason: Option<String>,
}

/// What the poller has already reported, so only changes become events
#[derive(Debug, Default)]
struct PollCursor {
    last_qr: Option<String>,
    connected: bool,
    credentials: Option<serde_json::Value>,
}

impl PollCursor {
    /// Translate a polled state into events; `true` when the connection is over
    fn observe(&mut self, state: BridgeSessionState) -> (Vec<TransportEvent>, bool) {
        let mut events = Vec::new();

        match state.state.as_str() {
            "connecting" | "starting" => {}
            "qr" | "qr_pending" => {
                if let Some(qr) = state.qr.filter(|q| self.last_qr.as_ref() != Some(q)) {
                    self.last_qr = Some(qr.clone());
                    events.push(TransportEvent::Qr(qr));
                }
            }
            "connected" | "open" => {
                if self.connected {
                    if let Some(creds) = state.credentials.filter(|c| self.credentials.as_ref() != Some(c)) {
                        self.credentials = Some(creds.clone());
                        events.push(TransportEvent::CredentialsUpdated(creds));
                    }
                } else {
                    self.connected = true;
                    self.credentials.clone_from(&state.credentials);
                    events.push(TransportEvent::Connected {
                        credentials: state.credentials,
                    });
                }
            }
            "logged_out" => {
                events.push(TransportEvent::Closed {
                    reason: CloseReason::LoggedOut,
                });
                return (events, true);
            }
            "pairing_failed" => {
                events.push(TransportEvent::Closed {
                    reason: CloseReason::PairingFailed,
                });
                return (events, true);
            }
            other => {
                debug!(state = other, reason = ?state.reason, "Bridge session closed");
                events.push(TransportEvent::Closed {
                    reason: CloseReason::ConnectionLost,
                });
                return (events, true);
            }
        }

        (events, false)
    }
}

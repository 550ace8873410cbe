//! Fake messaging bridge
//!
//! Every connection pairs instantly. Sends are recorded, and tests can push
//! inbound events through a live connection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use courier_core::{InboundEvent, PhoneNumber, StoreId};
use courier_session::{MessagingTransport, PollRequest, TransportError, TransportEvent, TransportResult};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

use crate::sender::SentMessage;

#[derive(Default)]
pub struct FakeBridge {
    connections: Mutex<HashMap<StoreId, mpsc::Sender<TransportEvent>>>,
    sent: Mutex<Vec<SentMessage>>,
    counter: AtomicU64,
    offline: AtomicBool,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the health check fail
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    /// Deliver an event as if the provider pushed it over the session
    pub async fn push_inbound(&self, event: InboundEvent) -> bool {
        let tx = self.connections.lock().get(&event.store_id).cloned();
        match tx {
            Some(tx) => tx.send(TransportEvent::Inbound(event)).await.is_ok(),
            None => false,
        }
    }

    fn record(&self, store_id: StoreId, to: &PhoneNumber, body: &str, options: &[String], key: &str) -> String {
        let message_id = format!("bridge-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        self.sent.lock().push(SentMessage {
            store_id,
            phone: to.as_str().to_string(),
            body: body.to_string(),
            options: options.to_vec(),
            idempotency_key: key.to_string(),
            message_id: message_id.clone(),
        });
        message_id
    }
}

#[async_trait]
impl MessagingTransport for FakeBridge {
    async fn connect(
        &self,
        store_id: StoreId,
        _credentials: Option<serde_json::Value>,
    ) -> TransportResult<mpsc::Receiver<TransportEvent>> {
        let (tx, rx) = mpsc::channel(16);
        tx.send(TransportEvent::Connected {
            credentials: Some(json!({ "store": store_id.into_inner() })),
        })
        .await
        .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        self.connections.lock().insert(store_id, tx);
        Ok(rx)
    }

    async fn send_text(
        &self,
        store_id: StoreId,
        to: &PhoneNumber,
        text: &str,
        idempotency_key: &str,
    ) -> TransportResult<String> {
        Ok(self.record(store_id, to, text, &[], idempotency_key))
    }

    async fn send_poll(
        &self,
        store_id: StoreId,
        to: &PhoneNumber,
        poll: &PollRequest,
        idempotency_key: &str,
    ) -> TransportResult<String> {
        Ok(self.record(store_id, to, &poll.question, &poll.options, idempotency_key))
    }

    async fn logout(&self, store_id: StoreId) -> TransportResult<()> {
        self.connections.lock().remove(&store_id);
        Ok(())
    }

    async fn health(&self) -> TransportResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(TransportError::Unreachable("bridge offline".to_string()))
        } else {
            Ok(())
        }
    }
}

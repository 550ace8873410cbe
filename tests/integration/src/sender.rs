//! Message sender that records every send instead of talking to a bridge

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use courier_core::{PhoneNumber, StoreId};
use courier_service::MessageSender;
use courier_session::SessionError;
use parking_lot::Mutex;

/// One recorded send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub store_id: StoreId,
    pub phone: String,
    /// Poll question or message text
    pub body: String,
    /// Poll options; empty for text messages
    pub options: Vec<String>,
    pub idempotency_key: String,
    pub message_id: String,
}

impl SentMessage {
    pub fn is_poll(&self) -> bool {
        !self.options.is_empty()
    }
}

/// Records sends; stores marked offline fail with `NotConnected`
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentMessage>>,
    offline: Mutex<HashSet<StoreId>>,
    counter: AtomicU64,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send for `store_id` fail as if its session were down
    pub fn set_offline(&self, store_id: StoreId) {
        self.offline.lock().insert(store_id);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn polls(&self) -> Vec<SentMessage> {
        self.sent().into_iter().filter(SentMessage::is_poll).collect()
    }

    pub fn texts(&self) -> Vec<SentMessage> {
        self.sent().into_iter().filter(|m| !m.is_poll()).collect()
    }

    /// How many sends used `key`
    pub fn sends_with_key(&self, key: &str) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.idempotency_key == key)
            .count()
    }

    fn record(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        body: &str,
        options: &[String],
        key: &str,
    ) -> Result<String, SessionError> {
        if self.offline.lock().contains(&store_id) {
            return Err(SessionError::NotConnected(store_id));
        }

        let message_id = format!("msg-{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        self.sent.lock().push(SentMessage {
            store_id,
            phone: phone.as_str().to_string(),
            body: body.to_string(),
            options: options.to_vec(),
            idempotency_key: key.to_string(),
            message_id: message_id.clone(),
        });
        Ok(message_id)
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_poll(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        question: &str,
        options: &[String],
        idempotency_key: &str,
    ) -> Result<String, SessionError> {
        self.record(store_id, phone, question, options, idempotency_key)
    }

    async fn send_text(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        text: &str,
        idempotency_key: &str,
    ) -> Result<String, SessionError> {
        self.record(store_id, phone, text, &[], idempotency_key)
    }
}

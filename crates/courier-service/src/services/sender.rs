//! Outbound messaging port used by the scheduler and the classifier

use async_trait::async_trait;
use courier_core::{PhoneNumber, StoreId};
use courier_session::{SessionError, SessionManager};

/// Sends messages through a store's messaging session
///
/// Every send carries an idempotency key derived from the task, so a task
/// re-dispatched after a crash is not delivered twice by the bridge.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_poll(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        question: &str,
        options: &[String],
        idempotency_key: &str,
    ) -> Result<String, SessionError>;

    async fn send_text(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        text: &str,
        idempotency_key: &str,
    ) -> Result<String, SessionError>;
}

#[async_trait]
impl MessageSender for SessionManager {
    async fn send_poll(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        question: &str,
        options: &[String],
        idempotency_key: &str,
    ) -> Result<String, SessionError> {
        self.send_poll_keyed(store_id, phone, question, options, idempotency_key)
            .await
    }

    async fn send_text(
        &self,
        store_id: StoreId,
        phone: &PhoneNumber,
        text: &str,
        idempotency_key: &str,
    ) -> Result<String, SessionError> {
        self.send_message_keyed(store_id, phone, text, idempotency_key)
            .await
    }
}

/// Idempotency key of the poll sent for a task
pub fn poll_key(task_id: i64) -> String {
    format!("feedback-poll-{task_id}")
}

/// Idempotency key of the canned reply sent for a task
pub fn reply_key(task_id: i64) -> String {
    format!("feedback-reply-{task_id}")
}

/// Idempotency key of the review request sent for a task
pub fn review_key(task_id: i64) -> String {
    format!("feedback-review-{task_id}")
}

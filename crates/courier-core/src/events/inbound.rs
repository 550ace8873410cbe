//! Inbound events delivered by the messaging provider (webhook or session stream)

use serde::{Deserialize, Serialize};

use crate::value_objects::{PhoneNumber, StoreId};

/// What the customer sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundPayload {
    /// Answer to a poll, correlated by the poll's provider message id
    PollVote {
        poll_message_id: String,
        selected_options: Vec<String>,
    },
    /// Free-text reply
    Text(String),
}

/// Customer reply addressed to a store's session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub store_id: StoreId,
    pub phone: PhoneNumber,
    pub payload: InboundPayload,
}

impl InboundEvent {
    pub fn poll_vote(
        store_id: StoreId,
        phone: PhoneNumber,
        poll_message_id: impl Into<String>,
        selected_options: Vec<String>,
    ) -> Self {
        Self {
            store_id,
            phone,
            payload: InboundPayload::PollVote {
                poll_message_id: poll_message_id.into(),
                selected_options,
            },
        }
    }

    pub fn text(store_id: StoreId, phone: PhoneNumber, text: impl Into<String>) -> Self {
        Self {
            store_id,
            phone,
            payload: InboundPayload::Text(text.into()),
        }
    }

    /// Poll message id referenced by the event, if any
    pub fn poll_message_id(&self) -> Option<&str> {
        match &self.payload {
            InboundPayload::PollVote {
                poll_message_id, ..
            } => Some(poll_message_id),
            InboundPayload::Text(_) => None,
        }
    }

    /// Candidate answers to classify, in the order they should be tried
    pub fn answers(&self) -> Vec<&str> {
        match &self.payload {
            InboundPayload::PollVote {
                selected_options, ..
            } => selected_options.iter().map(String::as_str).collect(),
            InboundPayload::Text(text) => vec![text.as_str()],
        }
    }
}

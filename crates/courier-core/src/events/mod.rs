//! Inbound provider events

mod inbound;

pub use inbound::{InboundEvent, InboundPayload};

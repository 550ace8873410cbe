//! Integration test utilities for the feedback core
//!
//! In-memory repositories, a recording message sender, a fake messaging
//! bridge and an HTTP test server built on them.

pub mod bridge;
pub mod fixtures;
pub mod helpers;
pub mod memory;
pub mod sender;

pub use bridge::FakeBridge;
pub use fixtures::*;
pub use helpers::*;
pub use memory::{Fault, MemoryStore};
pub use sender::{RecordingSender, SentMessage};

//! Entity <-> Model mappers
//!
//! Task rows fail to map when the stored status or phone is not one the domain
//! accepts, so those conversions are `TryFrom` and surface a `DomainError`.

mod session;
mod settings;
mod task;

pub use task::collect_stats;

//! Session registry and connection drivers

mod driver;
mod manager;
mod session;

pub use manager::{ReportedState, SessionManager, StatusReport};
pub use session::SessionSnapshot;

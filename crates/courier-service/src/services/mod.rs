//! Business logic services

pub mod context;
pub mod error;
pub mod feedback;
pub mod sender;
pub mod session;

pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use feedback::FeedbackService;
pub use sender::MessageSender;
pub use session::SessionService;

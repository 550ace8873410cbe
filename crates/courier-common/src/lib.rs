//! # courier-common
//!
//! Shared utilities including configuration, error handling, and telemetry.

pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{
    ApiConfig, AppConfig, AppSettings, BridgeConfig, ConfigError, CorsConfig, DatabaseConfig,
    Environment, SchedulerConfig, SessionConfig,
};
pub use error::{AppError, AppResult};
pub use telemetry::{init_tracing, LogFormat, TracingConfig, TracingError};

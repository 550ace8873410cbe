//! Configuration structs

mod app_config;

pub use app_config::{
    ApiConfig, AppConfig, AppSettings, BridgeConfig, ConfigError, CorsConfig, DatabaseConfig,
    Environment, SchedulerConfig, SessionConfig,
};

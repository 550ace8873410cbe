//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub bridge: BridgeConfig,
    pub session: SessionConfig,
    pub scheduler: SchedulerConfig,
    pub cors: CorsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// HTTP access layer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Bearer key required on the control endpoints
    pub api_key: String,
    /// Shared secret the messaging bridge sends with webhooks
    pub webhook_secret: String,
}

impl ApiConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Directory holding SQL migrations applied at startup
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,
}

/// Messaging bridge (provider sidecar) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_bridge_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_bridge_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BridgeConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Session lifecycle tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_qr_wait_ms")]
    pub qr_wait_ms: u64,
    #[serde(default = "default_pairing_timeout_secs")]
    pub pairing_timeout_secs: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Resume sessions with stored credentials at startup
    #[serde(default = "default_true")]
    pub resume_on_startup: bool,
}

impl SessionConfig {
    #[must_use]
    pub fn qr_wait(&self) -> Duration {
        Duration::from_millis(self.qr_wait_ms)
    }

    #[must_use]
    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_secs(self.pairing_timeout_secs)
    }

    /// Backoff before reconnect attempt `attempt` (1-based): base doubled per attempt, capped
    #[must_use]
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let delay = self.reconnect_base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.reconnect_max_delay_ms))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            qr_wait_ms: default_qr_wait_ms(),
            pairing_timeout_secs: default_pairing_timeout_secs(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            resume_on_startup: true,
        }
    }
}

/// Feedback scheduler tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dispatch_interval_secs")]
    pub dispatch_interval_secs: u64,
    #[serde(default = "default_expiry_interval_secs")]
    pub expiry_interval_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_send_delay_min_ms")]
    pub send_delay_min_ms: u64,
    #[serde(default = "default_send_delay_max_ms")]
    pub send_delay_max_ms: u64,
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,
    #[serde(default = "default_stale_claim_minutes")]
    pub stale_claim_minutes: i64,
}

impl SchedulerConfig {
    #[must_use]
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_secs(self.dispatch_interval_secs)
    }

    #[must_use]
    pub fn expiry_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_interval_secs)
    }

    #[must_use]
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dispatch_interval_secs: default_dispatch_interval_secs(),
            expiry_interval_secs: default_expiry_interval_secs(),
            batch_size: default_batch_size(),
            send_delay_min_ms: default_send_delay_min_ms(),
            send_delay_max_ms: default_send_delay_max_ms(),
            startup_delay_secs: default_startup_delay_secs(),
            stale_claim_minutes: default_stale_claim_minutes(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// Default value functions
fn default_app_name() -> String {
    "courier".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_migrations_dir() -> String {
    "./migrations".to_string()
}

fn default_bridge_poll_interval_ms() -> u64 {
    2000
}

fn default_bridge_request_timeout_secs() -> u64 {
    15
}

fn default_qr_wait_ms() -> u64 {
    5000
}

fn default_pairing_timeout_secs() -> u64 {
    120
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    2000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_dispatch_interval_secs() -> u64 {
    30
}

fn default_expiry_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_batch_size() -> u32 {
    10
}

fn default_send_delay_min_ms() -> u64 {
    2000
}

fn default_send_delay_max_ms() -> u64 {
    4000
}

fn default_startup_delay_secs() -> u64 {
    10
}

fn default_stale_claim_minutes() -> i64 {
    10
}

/// Read an optional variable, failing when it is present but unparsable
fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(None),
    }
}

fn require<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let scheduler = SchedulerConfig {
            enabled: parse_var(&lookup, "SCHEDULER_ENABLED")?.unwrap_or(true),
            dispatch_interval_secs: parse_var(&lookup, "SCHEDULER_DISPATCH_INTERVAL_SECS")?
                .unwrap_or_else(default_dispatch_interval_secs),
            expiry_interval_secs: parse_var(&lookup, "SCHEDULER_EXPIRY_INTERVAL_SECS")?
                .unwrap_or_else(default_expiry_interval_secs),
            batch_size: parse_var(&lookup, "SCHEDULER_BATCH_SIZE")?
                .unwrap_or_else(default_batch_size),
            send_delay_min_ms: parse_var(&lookup, "SCHEDULER_SEND_DELAY_MIN_MS")?
                .unwrap_or_else(default_send_delay_min_ms),
            send_delay_max_ms: parse_var(&lookup, "SCHEDULER_SEND_DELAY_MAX_MS")?
                .unwrap_or_else(default_send_delay_max_ms),
            startup_delay_secs: parse_var(&lookup, "SCHEDULER_STARTUP_DELAY_SECS")?
                .unwrap_or_else(default_startup_delay_secs),
            stale_claim_minutes: parse_var(&lookup, "SCHEDULER_STALE_CLAIM_MINUTES")?
                .unwrap_or_else(default_stale_claim_minutes),
        };

        if scheduler.batch_size == 0 {
            return Err(ConfigError::InvalidValue(
                "SCHEDULER_BATCH_SIZE",
                "0".to_string(),
            ));
        }
        if scheduler.send_delay_min_ms > scheduler.send_delay_max_ms {
            return Err(ConfigError::InvalidValue(
                "SCHEDULER_SEND_DELAY_MIN_MS",
                format!(
                    "{} exceeds SCHEDULER_SEND_DELAY_MAX_MS {}",
                    scheduler.send_delay_min_ms, scheduler.send_delay_max_ms
                ),
            ));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .as_deref()
                    .and_then(Environment::parse)
                    .unwrap_or_default(),
            },
            api: ApiConfig {
                host: lookup("API_HOST").unwrap_or_else(default_host),
                port: parse_var(&lookup, "API_PORT")?.ok_or(ConfigError::MissingVar("API_PORT"))?,
                api_key: require(&lookup, "API_KEY")?,
                webhook_secret: require(&lookup, "WEBHOOK_SECRET")?,
            },
            database: DatabaseConfig {
                url: require(&lookup, "DATABASE_URL")?,
                max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: parse_var(&lookup, "DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
                migrations_dir: lookup("DATABASE_MIGRATIONS_DIR")
                    .unwrap_or_else(default_migrations_dir),
            },
            bridge: BridgeConfig {
                url: require(&lookup, "BRIDGE_URL")?,
                token: lookup("BRIDGE_TOKEN").filter(|t| !t.is_empty()),
                poll_interval_ms: parse_var(&lookup, "BRIDGE_POLL_INTERVAL_MS")?
                    .unwrap_or_else(default_bridge_poll_interval_ms),
                request_timeout_secs: parse_var(&lookup, "BRIDGE_REQUEST_TIMEOUT_SECS")?
                    .unwrap_or_else(default_bridge_request_timeout_secs),
            },
            session: SessionConfig {
                qr_wait_ms: parse_var(&lookup, "SESSION_QR_WAIT_MS")?
                    .unwrap_or_else(default_qr_wait_ms),
                pairing_timeout_secs: parse_var(&lookup, "SESSION_PAIRING_TIMEOUT_SECS")?
                    .unwrap_or_else(default_pairing_timeout_secs),
                max_reconnect_attempts: parse_var(&lookup, "SESSION_MAX_RECONNECT_ATTEMPTS")?
                    .unwrap_or_else(default_max_reconnect_attempts),
                reconnect_base_delay_ms: parse_var(&lookup, "SESSION_RECONNECT_BASE_DELAY_MS")?
                    .unwrap_or_else(default_reconnect_base_delay_ms),
                reconnect_max_delay_ms: parse_var(&lookup, "SESSION_RECONNECT_MAX_DELAY_MS")?
                    .unwrap_or_else(default_reconnect_max_delay_ms),
                resume_on_startup: parse_var(&lookup, "SESSION_RESUME_ON_STARTUP")?
                    .unwrap_or(true),
            },
            scheduler,
            cors: CorsConfig {
                allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                    .map(|s| s.split(',').map(str::trim).map(String::from).collect())
                    .unwrap_or_default(),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

//! Application configuration loaded from environment variables.

use std::time::Duration;

use checkout::SweeperConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — Postgres connection string; in-memory store when unset
/// - `GATEWAY_URL` — payment gateway base URL; mock gateway when unset
/// - `GATEWAY_API_KEY` — bearer token for the gateway (optional)
/// - `GATEWAY_TIMEOUT_MS` — gateway request timeout (default: `5000`)
/// - `CURRENCY` — ISO currency code for gateway intents (default: `"usd"`)
/// - `SWEEP_INTERVAL_SECS` — reconciliation sweep period (default: `30`)
/// - `CONFIRMATION_TIMEOUT_SECS` — how long AwaitingConfirmation may
///   linger before the sweep picks it up (default: `900`)
/// - `SWEEP_MAX_ATTEMPTS` — sweep retries before failing closed (default: `5`)
/// - `SWEEP_BATCH_LIMIT` — orders examined per sweep (default: `100`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub gateway_url: Option<String>,
    pub gateway_api_key: Option<String>,
    pub gateway_timeout: Duration,
    pub currency: String,
    pub sweep_interval: Duration,
    pub confirmation_timeout: Duration,
    pub sweep_max_attempts: u32,
    pub sweep_batch_limit: usize,
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parsed("PORT", 3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            gateway_url: std::env::var("GATEWAY_URL").ok(),
            gateway_api_key: std::env::var("GATEWAY_API_KEY").ok(),
            gateway_timeout: Duration::from_millis(env_parsed("GATEWAY_TIMEOUT_MS", 5000)),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            sweep_interval: Duration::from_secs(env_parsed("SWEEP_INTERVAL_SECS", 30)),
            confirmation_timeout: Duration::from_secs(env_parsed(
                "CONFIRMATION_TIMEOUT_SECS",
                900,
            )),
            sweep_max_attempts: env_parsed("SWEEP_MAX_ATTEMPTS", 5),
            sweep_batch_limit: env_parsed("SWEEP_BATCH_LIMIT", 100),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The sweeper tuning derived from this configuration.
    pub fn sweeper_config(&self) -> SweeperConfig {
        SweeperConfig {
            sweep_interval: self.sweep_interval,
            confirmation_timeout: self.confirmation_timeout,
            max_attempts: self.sweep_max_attempts,
            batch_limit: self.sweep_batch_limit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            gateway_url: None,
            gateway_api_key: None,
            gateway_timeout: Duration::from_millis(5000),
            currency: "usd".to_string(),
            sweep_interval: Duration::from_secs(30),
            confirmation_timeout: Duration::from_secs(900),
            sweep_max_attempts: 5,
            sweep_batch_limit: 100,
        }
    }
}

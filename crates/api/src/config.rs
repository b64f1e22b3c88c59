//! Application configuration loaded from environment variables.

use std::time::Duration;

use inventory_store::HttpStoreConfig;
use workflow::RetryPolicy;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Which inventory store implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// REST record backend at `store_url`.
    #[default]
    Http,
    /// Process-local store; data is lost on restart.
    Memory,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `STORE_BACKEND`: `http` or `memory` (default: `http`)
/// - `STORE_URL`: backend root (default: `"http://127.0.0.1:8090"`)
/// - `STORE_TOKEN`: optional bearer token
/// - `STORE_TIMEOUT_SECS`: per-call timeout (default: `10`)
/// - `ADJUST_MAX_ATTEMPTS`: stock adjustment attempts (default: `3`)
/// - `ADJUST_BACKOFF_MS`: linear backoff step (default: `50`)
/// - `CURRENCY`: suffix for formatted totals (default: `"TZS"`)
///
/// Unparseable values fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub store_backend: StoreBackend,
    pub store_url: String,
    pub store_token: Option<String>,
    pub store_timeout: Duration,
    pub adjust_max_attempts: u32,
    pub adjust_backoff: Duration,
    pub currency: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match get("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase) {
                Some(f) if f == "json" => LogFormat::Json,
                _ => defaults.log_format,
            },
            store_backend: match get("STORE_BACKEND").as_deref().map(str::to_ascii_lowercase) {
                Some(b) if b == "memory" => StoreBackend::Memory,
                _ => defaults.store_backend,
            },
            store_url: get("STORE_URL").unwrap_or(defaults.store_url),
            store_token: get("STORE_TOKEN"),
            store_timeout: get("STORE_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.store_timeout),
            adjust_max_attempts: get("ADJUST_MAX_ATTEMPTS")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.adjust_max_attempts),
            adjust_backoff: get("ADJUST_BACKOFF_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.adjust_backoff),
            currency: get("CURRENCY").unwrap_or(defaults.currency),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn store_config(&self) -> HttpStoreConfig {
        HttpStoreConfig {
            base_url: self.store_url.clone(),
            token: self.store_token.clone(),
            timeout: self.store_timeout,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.adjust_max_attempts, self.adjust_backoff)
            .with_call_timeout(self.store_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            store_backend: StoreBackend::Http,
            store_url: "http://127.0.0.1:8090".to_string(),
            store_token: None,
            store_timeout: Duration::from_secs(10),
            adjust_max_attempts: 3,
            adjust_backoff: Duration::from_millis(50),
            currency: "TZS".to_string(),
        }
    }
}

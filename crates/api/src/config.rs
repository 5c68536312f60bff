//! Server configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `json` for JSON log lines, anything else for text
/// - `SESSION_IDLE_SECS` — idle time before an open checkout session is
///   evicted (default: `1800`)
///
/// Checkout settings (payee, fees, delivery area) are loaded separately
/// by [`checkout::CheckoutConfig::from_env`].
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub session_idle: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: get("LOG_FORMAT").is_some_and(|f| f.trim().eq_ignore_ascii_case("json")),
            session_idle: get("SESSION_IDLE_SECS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_idle),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_json: false,
            session_idle: Duration::from_secs(30 * 60),
        }
    }
}

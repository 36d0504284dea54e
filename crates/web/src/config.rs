//! Web front end configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BODEGA_API_URL` - Base URL of the inventory backend (e.g. `http://localhost:8000`)
//!
//! ## Optional
//! - `BODEGA_HOST` - Bind address (default: 127.0.0.1)
//! - `BODEGA_PORT` - Listen port (default: 3000)
//! - `BODEGA_BASE_URL` - Public URL of this site (default: `http://localhost:3000`)
//! - `BODEGA_TIMEZONE_OFFSET_HOURS` - Offset used to display dates (default: -3)
//! - `BODEGA_LOG_JSON` - Emit JSON logs when set to `1` or `true`
//! - `BODEGA_TRUST_PROXY` - Key the login rate limit on `X-Forwarded-For`;
//!   set only behind a proxy that overwrites the header
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use chrono::{FixedOffset, Offset, Utc};
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Web application configuration.
#[derive(Clone)]
pub struct WebConfig {
    /// Inventory backend base URL
    pub api_url: String,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL; `https://` turns on secure cookies
    pub base_url: String,
    /// Hours east of UTC used when displaying timestamps
    pub timezone_offset_hours: i32,
    /// JSON log output
    pub log_json: bool,
    /// Read the client IP from proxy headers
    pub trust_proxy: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<SecretString>,
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for WebConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebConfig")
            .field("api_url", &self.api_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("timezone_offset_hours", &self.timezone_offset_hours)
            .field("log_json", &self.log_json)
            .field("trust_proxy", &self.trust_proxy)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let api_url = get_required_env("BODEGA_API_URL")?;
        Url::parse(&api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("BODEGA_API_URL".to_string(), e.to_string()))?;

        let host = get_env_or_default("BODEGA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BODEGA_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("BODEGA_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("BODEGA_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("BODEGA_BASE_URL", "http://localhost:3000");
        let timezone_offset_hours = parse_offset(&get_env_or_default(
            "BODEGA_TIMEZONE_OFFSET_HOURS",
            "-3",
        ))?;
        let log_json = get_optional_env("BODEGA_LOG_JSON").is_some_and(|v| is_truthy(&v));
        let trust_proxy = get_optional_env("BODEGA_TRUST_PROXY").is_some_and(|v| is_truthy(&v));

        Ok(Self {
            api_url,
            host,
            port,
            base_url,
            timezone_offset_hours,
            log_json,
            trust_proxy,
            sentry_dsn: get_optional_env("SENTRY_DSN").map(SecretString::from),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Display timezone.
    #[must_use]
    pub fn timezone(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone_offset_hours * 3600)
            .unwrap_or_else(|| Utc.fix())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable; blank counts as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Whole hours between -12 and +14.
fn parse_offset(raw: &str) -> Result<i32, ConfigError> {
    let invalid = |msg: String| {
        ConfigError::InvalidEnvVar("BODEGA_TIMEZONE_OFFSET_HOURS".to_string(), msg)
    };
    let hours = raw.trim().parse::<i32>().map_err(|e| invalid(e.to_string()))?;
    if (-12..=14).contains(&hours) {
        Ok(hours)
    } else {
        Err(invalid(format!("{hours} is outside -12..=14")))
    }
}

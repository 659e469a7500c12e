//! Client configuration.
//!
//! Base URLs for the three API hosts, credentials and retry limits. Defaults
//! point at production. Override via environment variables or explicit
//! construction for staging and tests.

use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

/// Configuration for connecting to the API.
///
/// Custom `Debug` implementation redacts the `access_token` field so the
/// token never reaches log output.
#[derive(Clone)]
pub struct ClientConfig {
    /// OAuth2 bearer token sent with every request except to the notify host.
    pub access_token: Zeroizing<String>,
    /// Host serving rpc-style routes.
    /// Default: <https://api.dropboxapi.com>
    pub api_url: Url,
    /// Host serving upload and download routes.
    pub content_url: Url,
    /// Host serving long-poll notification routes.
    pub notify_url: Url,
    /// Prepended to the SDK's own agent string when set.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after a 5xx response or a transport failure.
    pub max_retries_on_error: u32,
    /// Retries after a 429 response; `None` retries without limit.
    pub max_retries_on_rate_limit: Option<u32>,
    /// First backoff delay; doubles on every consecutive server error.
    pub retry_base_delay: Duration,
    /// Sent with every request to the api and content hosts.
    pub headers: Vec<(String, String)>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("access_token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("content_url", &self.content_url)
            .field("notify_url", &self.notify_url)
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries_on_error", &self.max_retries_on_error)
            .field("max_retries_on_rate_limit", &self.max_retries_on_rate_limit)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("headers", &self.headers)
            .finish()
    }
}

pub const DEFAULT_API_URL: &str = "https://api.dropboxapi.com";
pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com";
pub const DEFAULT_NOTIFY_URL: &str = "https://notify.dropboxapi.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES_ON_ERROR: u32 = 4;

impl ClientConfig {
    /// Production hosts and default limits for the given token.
    pub fn new(access_token: impl Into<String>) -> Result<Self, ConfigError> {
        let access_token = Zeroizing::new(access_token.into());
        if access_token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(Self {
            access_token,
            api_url: parse_url("api_url", DEFAULT_API_URL)?,
            content_url: parse_url("content_url", DEFAULT_CONTENT_URL)?,
            notify_url: parse_url("notify_url", DEFAULT_NOTIFY_URL)?,
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries_on_error: DEFAULT_MAX_RETRIES_ON_ERROR,
            max_retries_on_rate_limit: None,
            retry_base_delay: Duration::from_secs(1),
            headers: Vec::new(),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DBX_ACCESS_TOKEN` (required)
    /// - `DBX_API_URL` (default: `https://api.dropboxapi.com`)
    /// - `DBX_CONTENT_URL` (default: `https://content.dropboxapi.com`)
    /// - `DBX_NOTIFY_URL` (default: `https://notify.dropboxapi.com`)
    /// - `DBX_TIMEOUT_SECS` (default: 30)
    /// - `DBX_USER_AGENT` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("DBX_ACCESS_TOKEN").map_err(|_| ConfigError::MissingToken)?;
        let mut config = Self::new(token)?;
        config.api_url = env_url("DBX_API_URL", DEFAULT_API_URL)?;
        config.content_url = env_url("DBX_CONTENT_URL", DEFAULT_CONTENT_URL)?;
        config.notify_url = env_url("DBX_NOTIFY_URL", DEFAULT_NOTIFY_URL)?;
        config.timeout_secs = std::env::var("DBX_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        config.user_agent = std::env::var("DBX_USER_AGENT").ok();
        Ok(config)
    }

    /// All three hosts pointed at one local mock server, with short delays.
    pub fn local_mock(base_url: &str, token: &str) -> Result<Self, ConfigError> {
        let url = parse_url("localhost", base_url)?;
        let mut config = Self::new(token)?;
        config.api_url = url.clone();
        config.content_url = url.clone();
        config.notify_url = url;
        config.timeout_secs = 5;
        config.max_retries_on_error = 2;
        config.retry_base_delay = Duration::from_millis(10);
        Ok(config)
    }

    /// The `User-Agent` header value.
    pub fn full_user_agent(&self) -> String {
        let base = concat!("DbxRustSDK/", env!("CARGO_PKG_VERSION"));
        match &self.user_agent {
            Some(prefix) => format!("{prefix}/{base}"),
            None => base.to_string(),
        }
    }
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_url(var, &raw)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("an access token is required (set DBX_ACCESS_TOKEN)")]
    MissingToken,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}

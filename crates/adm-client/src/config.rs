//! Marketplace API client configuration.
//!
//! One base URL serves every resource. Override via environment variables
//! or explicit construction for staging and tests.

use url::Url;
use zeroize::Zeroizing;

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to the marketplace API.
///
/// Custom `Debug` implementation redacts the `api_token` field.
#[derive(Clone)]
pub struct MarketApiConfig {
    /// Base URL; resources live under `{base_url}/api/v1`.
    pub base_url: Url,
    /// Bearer token for API authentication. Zeroized on drop.
    pub api_token: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for MarketApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketApiConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl MarketApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `MARKET_API_URL` (default: `http://127.0.0.1:8080`)
    /// - `MARKET_API_TOKEN` (required)
    /// - `MARKET_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = std::env::var("MARKET_API_TOKEN").map_err(|_| ConfigError::MissingToken)?;
        if api_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }

        Ok(Self {
            base_url: env_url("MARKET_API_URL", DEFAULT_API_URL)?,
            api_token: Zeroizing::new(api_token),
            timeout_secs: std::env::var("MARKET_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Configuration for an explicit base URL, e.g. a local mock server.
    pub fn new(base_url: &str, token: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base(base_url, base_url)?,
            api_token: Zeroizing::new(token.to_string()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Full URL for `segments` below `{base_url}/api/v1`.
    ///
    /// Each segment is percent-encoded as a single path segment, so an
    /// identifier can never introduce `/`, `?` or `#` into the path.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Bases are checked for a hierarchical path at construction.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "v1"]).extend(segments);
        }
        url
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_base(var, &raw)
}

fn parse_base(source: &str, raw: &str) -> Result<Url, ConfigError> {
    let url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(source.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(
            source.to_string(),
            "URL cannot carry a path".into(),
        ));
    }
    Ok(url)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MARKET_API_TOKEN environment variable is required")]
    MissingToken,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}

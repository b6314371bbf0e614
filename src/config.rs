// Client configuration
// Loaded from environment variables with defaults, or built directly

use anyhow::{Context, Result};

const DEFAULT_API_PREFIX: &str = "/api/v1";
const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
const DEFAULT_CONNECT_TIMEOUT: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT: u64 = 30;
const DEFAULT_MAX_CONNECTIONS: usize = 20;

/// Configuration for an [`ApiClient`](crate::ApiClient).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://api.newsdesk.example`.
    pub base_url: String,

    /// Version prefix every route is mounted under.
    pub api_prefix: String,

    /// Relative path of the dedicated token refresh endpoint.
    pub refresh_path: String,

    /// TCP connect timeout in seconds.
    pub connect_timeout: u64,

    /// Per-request timeout in seconds. This is the only ceiling applied
    /// to the refresh call as well; there is no separate refresh timeout.
    pub request_timeout: u64,

    /// Connection pool size per host.
    pub max_connections: usize,
}

impl ClientConfig {
    /// Build a configuration with defaults for everything but the origin.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Load configuration from the environment (ENV > defaults).
    ///
    /// Reads `.env` if present, then `NEWSDESK_API_BASE_URL` (required),
    /// `NEWSDESK_API_PREFIX`, `NEWSDESK_REFRESH_PATH`,
    /// `NEWSDESK_CONNECT_TIMEOUT`, `NEWSDESK_REQUEST_TIMEOUT`,
    /// `NEWSDESK_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let base_url = std::env::var("NEWSDESK_API_BASE_URL")
            .context("NEWSDESK_API_BASE_URL is not set")?;

        let mut config = Self::new(base_url);

        if let Ok(prefix) = std::env::var("NEWSDESK_API_PREFIX") {
            config.api_prefix = prefix;
        }
        if let Ok(path) = std::env::var("NEWSDESK_REFRESH_PATH") {
            config.refresh_path = path;
        }
        if let Ok(value) = std::env::var("NEWSDESK_CONNECT_TIMEOUT") {
            config.connect_timeout = value
                .parse()
                .context("NEWSDESK_CONNECT_TIMEOUT must be a number of seconds")?;
        }
        if let Ok(value) = std::env::var("NEWSDESK_REQUEST_TIMEOUT") {
            config.request_timeout = value
                .parse()
                .context("NEWSDESK_REQUEST_TIMEOUT must be a number of seconds")?;
        }
        if let Ok(value) = std::env::var("NEWSDESK_MAX_CONNECTIONS") {
            config.max_connections = value
                .parse()
                .context("NEWSDESK_MAX_CONNECTIONS must be a number")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable before building a client.
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("base_url must start with http:// or https://");
        }
        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than zero");
        }
        if self.connect_timeout == 0 {
            anyhow::bail!("connect_timeout must be greater than zero");
        }
        Ok(())
    }

    /// Absolute URL for a relative request path. A path already carrying
    /// the version prefix is not prefixed twice.
    pub(crate) fn endpoint_url(&self, path: &str) -> String {
        let path = path.strip_prefix(self.api_prefix.as_str()).unwrap_or(path);
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}{}", base, self.api_prefix, path)
        } else {
            format!("{}{}/{}", base, self.api_prefix, path)
        }
    }
}

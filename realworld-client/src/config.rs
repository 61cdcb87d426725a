//! Process-wide client configuration.

use std::env;
use std::time::Duration;

pub const API_URL_VAR: &str = "REALWORLD_API_URL";
pub const TIMEOUT_VAR: &str = "REALWORLD_TIMEOUT_SECS";
pub const DEFAULT_API_URL: &str = "https://api.realworld.io/api";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub base_url: String,
    /// Request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize(base_url.into()),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read the configuration once at startup, honouring a local `.env` file.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url = env::var(API_URL_VAR)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout = env::var(TIMEOUT_VAR)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        tracing::debug!("API base URL: {}", base_url);

        Self {
            base_url: normalize(base_url),
            timeout,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

fn normalize(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

//! Tool backend configuration.

use std::time::Duration;

/// Default backend URL for a self-hosted deployment.
pub const DEFAULT_BACKEND_URL: &str = "http://aci-backend:8000";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`HttpToolBackend`](crate::HttpToolBackend).
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    /// Base URL of the tool backend
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// API key sent as `X-API-KEY`
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_key: None,
        }
    }
}

impl BackendConfig {
    /// Read `ACI_BACKEND_URL`, `ACI_API_KEY` and `ACI_TIMEOUT_SECS`, falling
    /// back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("ACI_BACKEND_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.base_url),
            timeout: lookup("ACI_TIMEOUT_SECS")
                .and_then(|secs| secs.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            api_key: lookup("ACI_API_KEY").filter(|key| !key.is_empty()),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Join a path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

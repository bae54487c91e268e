use std::time::Duration;

use reqwest::Url;

use crate::error::ExplorerError;

/// API root used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Environment variable overriding [`DEFAULT_API_URL`].
pub const API_URL_ENV: &str = "EXPENSE_EXPLORER_API_URL";

/// Connection settings for the backend API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    timeout: Duration,
    connect_retries: u32,
    user_agent: String,
}

impl ClientConfig {
    /// Builds a configuration for the API rooted at `base_url`
    /// (e.g. `https://expenses.example.com/api`).
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute `http`/`https` URL.
    pub fn new(base_url: &str) -> Result<Self, ExplorerError> {
        let parsed = Url::parse(base_url).map_err(|e| ExplorerError::InvalidInput {
            error: format!("invalid API url {base_url:?}: {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExplorerError::InvalidInput {
                error: format!("API url must use http or https, got {}", parsed.scheme()),
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            connect_retries: 2, // total attempts = 3
            user_agent: format!("expense-core/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Reads the API root from [`API_URL_ENV`], falling back to
    /// [`DEFAULT_API_URL`].
    ///
    /// # Errors
    ///
    /// Returns an error if the variable holds an invalid URL.
    pub fn from_env() -> Result<Self, ExplorerError> {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::new(DEFAULT_API_URL),
        }
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many times a request is re-sent after a connection failure.
    #[must_use]
    pub const fn with_connect_retries(mut self, retries: u32) -> Self {
        self.connect_retries = retries;
        self
    }

    /// Overrides the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// API root without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Re-sends after connection failures.
    #[must_use]
    pub const fn connect_retries(&self) -> u32 {
        self.connect_retries
    }

    /// `User-Agent` header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Absolute URL for an API path such as `/auth/login/`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            connect_retries: 2,
            user_agent: format!("expense-core/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let config = ClientConfig::new("https://expenses.example.com/api/").unwrap();
        assert_eq!(config.base_url(), "https://expenses.example.com/api");
        assert_eq!(
            config.url("/auth/login/"),
            "https://expenses.example.com/api/auth/login/"
        );
        assert_eq!(
            config.url("statements/4/"),
            "https://expenses.example.com/api/statements/4/"
        );
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(ClientConfig::new("localhost:8000").is_err());
        assert!(ClientConfig::new("ftp://example.com").is_err());
        assert!(ClientConfig::new("").is_err());
    }

    #[test]
    fn test_default_matches_default_url() {
        let config = ClientConfig::default();
        assert_eq!(config, ClientConfig::new(DEFAULT_API_URL).unwrap());
        assert!(config.user_agent().starts_with("expense-core/"));
    }
}

//! Connection settings resolved once at startup.

use std::time::Duration;

use url::Url;

/// Default API endpoint when no override is supplied.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Fleetline backend; request paths are joined onto it.
    pub base_url: Url,
    /// Timeout applied to every request, the refresh call included.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Settings for the given endpoint with the default timeout.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Replace the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_parses() {
        let url: Url = DEFAULT_API_URL.parse().expect("default URL is valid");
        let config = ClientConfig::new(url);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn with_timeout_overrides_default() {
        let config = ClientConfig::new("http://localhost:9000".parse().expect("valid URL"))
            .with_timeout(Duration::from_secs(2));
        assert_eq!(config.timeout, Duration::from_secs(2));
    }
}

//! Client configuration.

use std::env;
use std::time::Duration;

/// Where and how to reach the DynamoDB endpoint.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint base URL; requests are `POST`ed to its root.
    pub endpoint_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint_url: env::var("DYNAMODB_ENDPOINT_URL").unwrap_or(defaults.endpoint_url),
            timeout: env::var("DYNAMODB_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map_or(defaults.timeout, Duration::from_secs),
        }
    }

    /// Same defaults, different endpoint.
    #[must_use]
    pub fn with_endpoint(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_url: "http://localhost:4566".to_owned(),
            timeout: Duration::from_secs(30),
        }
    }
}

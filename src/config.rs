//! Provider configuration.
//!
//! The provider block supplies an optional `api_key` and `api_url`. Explicit
//! values win over the `CLERK_API_KEY` / `CLERK_API_URL` environment
//! variables. A missing key is a configuration error raised before any
//! resource operation runs.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ProviderError;
use crate::value::UNKNOWN_VALUE;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "CLERK_API_KEY";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "CLERK_API_URL";

/// Default Clerk Backend API base URL.
pub const DEFAULT_API_URL: &str = "https://api.clerk.com/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The provider block as written by the operator.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Clerk secret key.
    pub api_key: Option<String>,
    /// Base URL of the Clerk Backend API.
    pub api_url: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl ProviderConfig {
    /// Parse the provider block. A JSON `null` is an empty block.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
            .map_err(|e| ProviderError::Validation(format!("invalid provider configuration: {}", e)))
    }

    /// Resolve with an environment lookup, usually `std::env::var`.
    pub fn resolve_with<F>(&self, env: F) -> Result<ClientConfig, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(self.api_key.clone())
            .or_else(|| non_empty(env(API_KEY_ENV)))
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "Missing API Key Configuration: the API key was not found in the {} \
                     environment variable or the provider configuration block api_key attribute",
                    API_KEY_ENV
                ))
            })?;

        let base_url = non_empty(self.api_url.clone())
            .or_else(|| non_empty(env(API_URL_ENV)))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(ClientConfig::new(api_key).with_base_url(base_url))
    }
}

// Empty strings and the host's unknown marker count as not set.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && v != UNKNOWN_VALUE)
}

/// Settings for constructing a [`ClerkClient`](crate::client::ClerkClient).
#[derive(Clone)]
pub struct ClientConfig {
    /// Clerk secret key sent as a bearer token.
    pub api_key: String,
    /// Base URL of the Clerk Backend API.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration with default URL and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

//! Configuration for the Terraform Cloud connector.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_ADDRESS: &str = "https://app.terraform.io";

/// Connector configuration.
///
/// ```yaml
/// token: "<team or user API token>"
/// address: "https://app.terraform.io"
/// request_timeout_secs: 30
/// max_retries: 3
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerraformCloudConfig {
    /// Bearer token for the upstream API. Redacted in `Debug`.
    pub token: SecretString,

    /// Base address of the Terraform Cloud or Terraform Enterprise instance.
    pub address: String,

    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,

    /// Retries for 429 and 5xx responses.
    pub max_retries: u32,
}

impl Default for TerraformCloudConfig {
    fn default() -> Self {
        Self {
            token: SecretString::from(String::new()),
            address: DEFAULT_ADDRESS.to_owned(),
            request_timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("token is required")]
    MissingToken,

    #[error("invalid address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request_timeout_secs must be greater than zero")]
    ZeroTimeout,
}

impl TerraformCloudConfig {
    /// Config with the given token and defaults for everything else.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            ..Self::default()
        }
    }

    /// Check the config before any client is built.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the token is blank, the address does not
    /// parse as a URL, or the timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        self.base_url()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// `address` parsed as a URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `address` is not a URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.address).map_err(|source| ConfigError::InvalidAddress {
            address: self.address.clone(),
            source,
        })
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

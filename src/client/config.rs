//! Client configuration.

use crate::error::{CmdbError, Result};
use crate::protocol::constants::DEFAULT_API_URL;

/// Configuration for [`CmdbClient`](super::CmdbClient) and its transport.
///
/// # Examples
///
/// ```
/// use cmdb_tools::client::ClientConfig;
///
/// let config = ClientConfig {
///     api_url: "http://localhost:8080/cmdb/api/v1.0".to_string(),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, including the version segment.
    pub api_url: String,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Proxy for all requests; empty for none.
    pub proxy_url: String,
    /// Log every request and status at debug level.
    pub enable_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: concat!("cmdbtools/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy_url: String::new(),
            enable_logging: true,
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at a different API base URL.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    /// Check that the base URL (and proxy, if any) are usable.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_url).map_err(|e| {
            CmdbError::InvalidArgument(format!("Invalid API URL '{}': {}", self.api_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CmdbError::InvalidArgument(format!(
                "Invalid API URL '{}': scheme must be http or https",
                self.api_url
            )));
        }
        if !self.proxy_url.is_empty() {
            url::Url::parse(&self.proxy_url).map_err(|e| {
                CmdbError::InvalidArgument(format!("Invalid proxy URL '{}': {}", self.proxy_url, e))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.proxy_url.is_empty());
        assert!(config.user_agent.starts_with("cmdbtools/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_api_url() {
        assert!(ClientConfig::with_api_url("db.cngb.org").validate().is_err());
        assert!(ClientConfig::with_api_url("ftp://db.cngb.org").validate().is_err());
    }

    #[test]
    fn test_invalid_proxy() {
        let config = ClientConfig {
            proxy_url: "::nope".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

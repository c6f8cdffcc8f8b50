//! Main CMDB API client.
//!
//! [`CmdbClient`] wraps an [`HttpTransport`] and knows the endpoints and status
//! conventions of the API:
//!
//! - **Token validation** via the canary lookup (`201` accepts the token)
//! - **Point lookups** by chromosome and position, token in the query string
//! - **Paged queries** that follow the server's `next` cursor, bearer auth
//!
//! # Examples
//!
//! ## Point lookup
//!
//! ```ignore
//! use cmdb_tools::CmdbClient;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = CmdbClient::new()?;
//!     match client.query_variant_by_position("my-token", "chr17", 41234470).await? {
//!         Some(body) => println!("{}", body),
//!         None => println!("not in the dataset"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Region query
//!
//! ```ignore
//! use cmdb_tools::{protocol::bearer_headers, CmdbClient};
//!
//! let client = CmdbClient::new()?;
//! let url = client.region_url("chr17", 41234470, 41242470, false)?;
//! let mut rows = client.query_paged(bearer_headers("my-token")?, url);
//! while let Some(row) = rows.next().await {
//!     println!("{}", row?);
//! }
//! ```

use std::sync::Arc;

use http::HeaderMap;
use serde_json::Value;

use crate::client::config::ClientConfig;
use crate::client::paged::PagedQuery;
use crate::client::transport::{HttpTransport, ReqwestTransport};
use crate::client::utils::{classify_point_status, is_token_accepted, redact_token, PointStatus};
use crate::error::{CmdbError, Result};
use crate::protocol::constants::{paths, CANARY_CHROMOSOME, CANARY_POSITION, DEFAULT_QUERY_ERROR};
use crate::protocol::{endpoint_url, position_query};

/// The CMDB API client.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct CmdbClient {
    transport: Arc<dyn HttpTransport>,
    config: Arc<ClientConfig>,
}

impl CmdbClient {
    /// Create a client for the default API with a `reqwest` transport.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with custom configuration and a `reqwest` transport.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client on top of an existing transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        CmdbClient {
            transport,
            config: Arc::new(config),
        }
    }

    /// Check a candidate token with the canary lookup.
    ///
    /// The token is accepted only if the server answers `201`. There is no
    /// retry: any other status is a definitive rejection.
    ///
    /// # Errors
    ///
    /// [`CmdbError::Auth`] on rejection; transport failures are passed through.
    pub async fn validate_token(&self, token: &str) -> Result<()> {
        let url = endpoint_url(&self.config.api_url, paths::VARIANT)?;
        let query = position_query(CANARY_CHROMOSOME, CANARY_POSITION);
        let params = [("token", token), ("type", "position"), ("query", query.as_str())];

        let response = self
            .transport
            .get(url.as_str(), &HeaderMap::new(), &params)
            .await?;
        self.log_response(url.as_str(), response.status);

        if !is_token_accepted(response.status) {
            tracing::warn!(status = response.status, "token rejected by canary lookup");
            return Err(CmdbError::Auth {
                status: response.status,
            });
        }
        Ok(())
    }

    /// Look up the variants at one position.
    ///
    /// Returns the decoded body on `201` and `None` on `404`.
    ///
    /// # Errors
    ///
    /// - [`CmdbError::Query`] with the server message on `403`
    /// - [`CmdbError::UnexpectedStatus`] for any other status
    /// - [`CmdbError::Parse`] if a `201` body is not JSON
    pub async fn query_variant_by_position(
        &self,
        token: &str,
        chromosome: &str,
        position: u64,
    ) -> Result<Option<Value>> {
        let url = endpoint_url(&self.config.api_url, paths::VARIANT)?;
        let query = position_query(chromosome, position);
        let params = [("type", "position"), ("query", query.as_str()), ("token", token)];

        let response = self
            .transport
            .get(url.as_str(), &HeaderMap::new(), &params)
            .await?;
        self.log_response(url.as_str(), response.status);

        match classify_point_status(response.status) {
            PointStatus::Found => Ok(Some(response.json()?)),
            PointStatus::NotFound => Ok(None),
            PointStatus::Forbidden => Err(CmdbError::Query(
                response.error_message(DEFAULT_QUERY_ERROR),
            )),
            PointStatus::Unexpected(status) => Err(CmdbError::UnexpectedStatus {
                status,
                url: redact_token(url.as_str()),
            }),
        }
    }

    /// Start a paged query at `url`.
    ///
    /// No request is made until the returned stream is polled.
    pub fn query_paged(&self, headers: HeaderMap, url: impl Into<String>) -> PagedQuery {
        PagedQuery::new(Arc::clone(&self.transport), headers, url)
    }

    /// URL of the region endpoint for `[start, end]`.
    ///
    /// `vcf` asks the server for VCF text rows instead of JSON records.
    pub fn region_url(&self, chromosome: &str, start: u64, end: u64, vcf: bool) -> Result<String> {
        let mut url = endpoint_url(&self.config.api_url, paths::REGION)?;
        url.query_pairs_mut()
            .append_pair("chrom", chromosome)
            .append_pair("start", &start.to_string())
            .append_pair("end", &end.to_string())
            .append_pair("vcf", if vcf { "1" } else { "0" });
        Ok(url.into())
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn log_response(&self, url: &str, status: u16) {
        if self.config.enable_logging {
            tracing::debug!(url = %redact_token(url), status, "CMDB response");
        }
    }
}

impl std::fmt::Debug for CmdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CmdbClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockTransport;
    use serde_json::json;

    fn client(transport: Arc<MockTransport>) -> CmdbClient {
        CmdbClient::with_transport(ClientConfig::with_api_url("http://mock/api/v1.0"), transport)
    }

    #[test]
    fn test_client_creation() {
        let client = CmdbClient::new().unwrap();
        assert_eq!(client.config().api_url, crate::protocol::constants::DEFAULT_API_URL);
    }

    #[test]
    fn test_client_rejects_bad_config() {
        assert!(CmdbClient::with_config(ClientConfig::with_api_url("nope")).is_err());
    }

    #[tokio::test]
    async fn test_validate_token_accepts_201() {
        let transport = Arc::new(MockTransport::new().respond_json(201, "[]"));
        client(transport.clone()).validate_token("t0k").await.unwrap();

        let url = &transport.requests()[0].url;
        assert_eq!(
            url,
            "http://mock/api/v1.0/variant?token=t0k&type=position&query=chr17-41234470"
        );
    }

    #[tokio::test]
    async fn test_validate_token_rejects_everything_else() {
        for status in [200, 403, 404, 500] {
            let transport = Arc::new(MockTransport::new().respond(status, ""));
            let err = client(transport).validate_token("t0k").await.unwrap_err();
            assert!(matches!(err, CmdbError::Auth { status: s } if s == status));
        }
    }

    #[tokio::test]
    async fn test_query_variant_found() {
        let body = r#"[{"allele_num": 100, "allele_count": 5, "allele_freq": 0.05, "filter_status": 0}]"#;
        let transport = Arc::new(MockTransport::new().respond_json(201, body));
        let found = client(transport.clone())
            .query_variant_by_position("t0k", "chr1", 100)
            .await
            .unwrap();
        assert_eq!(found.unwrap()[0]["allele_count"], json!(5));
        assert_eq!(
            transport.requests()[0].url,
            "http://mock/api/v1.0/variant?type=position&query=chr1-100&token=t0k"
        );
    }

    #[tokio::test]
    async fn test_query_variant_not_found() {
        let transport = Arc::new(MockTransport::new().respond(404, "Not Found"));
        let found = client(transport)
            .query_variant_by_position("t0k", "chr1", 100)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_query_variant_forbidden() {
        let transport = Arc::new(MockTransport::new().respond_json(403, r#"{"error": "Access denied."}"#));
        let err = client(transport)
            .query_variant_by_position("t0k", "chr1", 100)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Access denied.");
    }

    #[tokio::test]
    async fn test_query_variant_unexpected_status_redacts_token() {
        let transport = Arc::new(MockTransport::new().respond(500, ""));
        let err = client(transport)
            .query_variant_by_position("secret", "chr1", 100)
            .await
            .unwrap_err();
        match err {
            CmdbError::UnexpectedStatus { status, url } => {
                assert_eq!(status, 500);
                assert!(!url.contains("secret"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_variant_bad_body() {
        let transport = Arc::new(MockTransport::new().respond(201, "<html>"));
        let err = client(transport)
            .query_variant_by_position("t0k", "chr1", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, CmdbError::Parse(_)));
    }

    #[test]
    fn test_region_url() {
        let client = client(Arc::new(MockTransport::new()));
        assert_eq!(
            client.region_url("chr17", 100, 8100, false).unwrap(),
            "http://mock/api/v1.0/region?chrom=chr17&start=100&end=8100&vcf=0"
        );
        assert!(client.region_url("chr17", 100, 8100, true).unwrap().ends_with("vcf=1"));
    }

    #[tokio::test]
    async fn test_query_paged_shares_transport() {
        let transport = Arc::new(
            MockTransport::new().respond_json(200, r#"{"format": "json", "data": [{"variant_id": "x"}]}"#),
        );
        let client = client(transport.clone());
        let headers = crate::protocol::bearer_headers("t0k").unwrap();
        let rows = client
            .query_paged(headers, "http://mock/api/v1.0/region?chrom=chr1")
            .collect_all()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(transport.requests()[0].headers["authorization"], "Bearer t0k");
    }
}

//! HTTP transport adapter.
//!
//! All network access goes through the [`HttpTransport`] trait so the query
//! clients can run against [`ReqwestTransport`] in production and
//! [`MockTransport`](super::MockTransport) in tests.
//!
//! A transport reports every completed exchange as a [`QueryResponse`], whatever
//! its status code: a `404` or `500` is data for the caller to classify, not an
//! error. Only exchanges that never produce a status (unreachable host,
//! malformed URL, body cut short) come back as
//! [`CmdbError::Transport`](crate::CmdbError::Transport).

use crate::client::config::ClientConfig;
use crate::error::{CmdbError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Status code and raw body of a completed HTTP exchange.
///
/// The body is decoded only when asked for, so callers can ignore bodies they
/// do not expect (a `404` lookup typically has none).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Bytes,
}

impl QueryResponse {
    /// Create a response from a status code and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        QueryResponse {
            status,
            body: body.into(),
        }
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CmdbError::Parse`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The server's `error` message, or `default` when the body has none.
    pub fn error_message(&self, default: &str) -> String {
        self.json::<Value>()
            .ok()
            .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }
}

/// Minimal HTTP capability used by the query clients.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET request with `params` encoded into the URL query.
    async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        params: &[(&str, &str)],
    ) -> Result<QueryResponse>;

    /// Issue a POST request with `form` URL-encoded as the body.
    async fn post(
        &self,
        url: &str,
        headers: &HeaderMap,
        form: &[(&str, &str)],
    ) -> Result<QueryResponse>;
}

/// [`HttpTransport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport from client configuration.
    ///
    /// Timeouts are left at the `reqwest` defaults.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .pool_idle_timeout(std::time::Duration::from_secs(90));

        if !config.proxy_url.is_empty() {
            let proxy = reqwest::Proxy::all(&config.proxy_url).map_err(|e| {
                CmdbError::InvalidArgument(format!("Invalid proxy URL '{}': {}", config.proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(ReqwestTransport {
            client: builder.build()?,
        })
    }

    /// Send a prepared request and collect status and body.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<QueryResponse> {
        let response = request
            .send()
            .await
            .map_err(|e| CmdbError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| CmdbError::Transport(e.to_string()))?;

        Ok(QueryResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        params: &[(&str, &str)],
    ) -> Result<QueryResponse> {
        let mut request = self.client.get(url).headers(headers.clone());
        if !params.is_empty() {
            request = request.query(params);
        }
        self.execute(request).await
    }

    async fn post(
        &self,
        url: &str,
        headers: &HeaderMap,
        form: &[(&str, &str)],
    ) -> Result<QueryResponse> {
        let request = self.client.post(url).headers(headers.clone()).form(form);
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_is_lazy() {
        let response = QueryResponse::new(404, Bytes::new());
        assert_eq!(response.status, 404);
        assert!(matches!(response.json::<Value>(), Err(CmdbError::Parse(_))));
    }

    #[test]
    fn test_json_decodes_body() {
        let response = QueryResponse::new(201, r#"[{"allele_num": 10}]"#);
        let body: Value = response.json().unwrap();
        assert_eq!(body, json!([{"allele_num": 10}]));
    }

    #[test]
    fn test_error_message() {
        let response = QueryResponse::new(403, r#"{"error": "Token expired"}"#);
        assert_eq!(response.error_message("fallback"), "Token expired");

        let response = QueryResponse::new(403, "<html>Forbidden</html>");
        assert_eq!(response.error_message("fallback"), "fallback");

        let response = QueryResponse::new(400, r#"{"detail": "x"}"#);
        assert_eq!(response.error_message("fallback"), "fallback");
    }


    #[test]
    fn test_reqwest_transport_rejects_bad_proxy() {
        let config = ClientConfig {
            proxy_url: "http://[::1".to_string(),
            ..Default::default()
        };
        assert!(ReqwestTransport::new(&config).is_err());
    }
}

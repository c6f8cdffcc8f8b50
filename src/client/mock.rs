//! In-memory transport for tests.
//!
//! [`MockTransport`] answers requests from a FIFO queue of scripted responses
//! and records every request it sees, so tests can assert both on what the
//! client did with a response and on what it sent.
//!
//! # Example
//!
//! ```
//! use cmdb_tools::client::{HttpTransport, MockTransport};
//!
//! # tokio_test::block_on(async {
//! let transport = MockTransport::new().respond_json(201, r#"[{"allele_num": 1}]"#);
//! let response = transport
//!     .get("http://mock/variant", &Default::default(), &[("type", "position")])
//!     .await
//!     .unwrap();
//! assert_eq!(response.status, 201);
//! assert_eq!(transport.requests()[0].url, "http://mock/variant?type=position");
//! # });
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use http::HeaderMap;
use parking_lot::Mutex;

use crate::client::transport::{HttpTransport, QueryResponse};
use crate::error::{CmdbError, Result};

/// A request seen by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// `GET` or `POST`.
    pub method: &'static str,
    /// Full URL, with GET parameters encoded into the query.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// URL-encoded POST body, empty for GET.
    pub body: String,
}

/// Scripted [`HttpTransport`].
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<QueryResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Create a transport with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body.
    pub fn respond(self, status: u16, body: impl Into<bytes::Bytes>) -> Self {
        self.responses
            .lock()
            .push_back(Ok(QueryResponse::new(status, body)));
        self
    }

    /// Queue a response with a JSON text body.
    pub fn respond_json(self, status: u16, body: &str) -> Self {
        self.respond(status, body.to_string())
    }

    /// Queue a transport failure.
    pub fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .push_back(Err(CmdbError::Transport(message.to_string())));
        self
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of scripted responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }

    fn answer(&self, request: RecordedRequest) -> Result<QueryResponse> {
        tracing::trace!(method = request.method, url = %request.url, "mock request");
        self.requests.lock().push(request);
        self.responses.lock().pop_front().unwrap_or_else(|| {
            Err(CmdbError::Transport(
                "mock transport has no scripted response left".to_string(),
            ))
        })
    }
}

fn encode(params: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        params: &[(&str, &str)],
    ) -> Result<QueryResponse> {
        let full_url = if params.is_empty() {
            url.to_string()
        } else {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{}{}{}", url, separator, encode(params))
        };

        self.answer(RecordedRequest {
            method: "GET",
            url: full_url,
            headers: headers.clone(),
            body: String::new(),
        })
    }

    async fn post(
        &self,
        url: &str,
        headers: &HeaderMap,
        form: &[(&str, &str)],
    ) -> Result<QueryResponse> {
        self.answer(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            headers: headers.clone(),
            body: encode(form),
        })
    }
}

//! Paged query stream.
//!
//! The region endpoint returns results in pages. Each page is a
//! [`PagedEnvelope`] whose `next` field holds the URL of the following page.
//! [`PagedQuery`] walks that cursor lazily, fetching a page only once every row
//! of the previous one has been consumed.
//!
//! # Lifecycle
//!
//! ```text
//! Pending(url) --fetch--> Fetching --200--> rows buffered --next--> Pending(next)
//!                              |                          \--none--> Exhausted
//!                              \--400/other/transport error--------> Exhausted
//! ```
//!
//! A `PagedQuery` consumes the server cursor: once `Exhausted` it only ever
//! yields `None`. Running the same query again means building a new one.
//!
//! # Examples
//!
//! ```ignore
//! use futures::StreamExt;
//!
//! let mut rows = client.query_paged(headers, url);
//! while let Some(row) = rows.next().await {
//!     println!("{}", row?);
//! }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::{ready, Stream};
use http::HeaderMap;
use serde_json::Value;

use crate::client::transport::{HttpTransport, QueryResponse};
use crate::client::utils::{classify_page_status, redact_token, PageStatus};
use crate::error::{CmdbError, Result};
use crate::protocol::constants::DEFAULT_QUERY_ERROR;
use crate::types::PagedEnvelope;

/// Position of a [`PagedQuery`] in its page cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagedState {
    /// A page URL is known but not requested yet.
    Pending,
    /// A page request is in flight.
    Fetching,
    /// The cursor ended or an error occurred; no more rows will be produced.
    Exhausted,
}

enum Cursor {
    Pending(String),
    Fetching {
        url: String,
        request: BoxFuture<'static, Result<QueryResponse>>,
    },
    Exhausted,
}

/// Lazily paginated query results.
///
/// Yields, in order: on the first page of a VCF-format query, each meta line
/// and then the header line (as JSON strings); then every `data` row of every
/// page, in server order.
pub struct PagedQuery {
    transport: Arc<dyn HttpTransport>,
    headers: HeaderMap,
    cursor: Cursor,
    buffered: VecDeque<Value>,
    pages_fetched: usize,
}

impl PagedQuery {
    /// Start a query at `url`. Nothing is requested until the first poll.
    pub fn new(transport: Arc<dyn HttpTransport>, headers: HeaderMap, url: impl Into<String>) -> Self {
        PagedQuery {
            transport,
            headers,
            cursor: Cursor::Pending(url.into()),
            buffered: VecDeque::new(),
            pages_fetched: 0,
        }
    }

    /// Current cursor state.
    pub fn state(&self) -> PagedState {
        match self.cursor {
            Cursor::Pending(_) => PagedState::Pending,
            Cursor::Fetching { .. } => PagedState::Fetching,
            Cursor::Exhausted => PagedState::Exhausted,
        }
    }

    /// True once the cursor has ended and every buffered row was consumed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.cursor, Cursor::Exhausted) && self.buffered.is_empty()
    }

    /// Number of pages received so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Receive the next row.
    ///
    /// Returns `None` when the query is exhausted.
    pub async fn next(&mut self) -> Option<Result<Value>> {
        futures::StreamExt::next(self).await
    }

    /// Drain the query into a vector, stopping at the first error.
    pub async fn collect_all(mut self) -> Result<Vec<Value>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await {
            rows.push(row?);
        }
        Ok(rows)
    }

    fn request(&self, url: &str) -> BoxFuture<'static, Result<QueryResponse>> {
        let transport = Arc::clone(&self.transport);
        let headers = self.headers.clone();
        let url = url.to_string();
        Box::pin(async move { transport.get(&url, &headers, &[]).await })
    }

    /// Validate one page, buffer its rows and return the next cursor URL.
    fn accept_page(&mut self, url: &str, response: QueryResponse) -> Result<Option<String>> {
        tracing::debug!(url = %redact_token(url), status = response.status, "page response");

        match classify_page_status(response.status) {
            PageStatus::Page => {}
            PageStatus::BadRequest => {
                return Err(CmdbError::Query(response.error_message(DEFAULT_QUERY_ERROR)))
            }
            PageStatus::Unexpected(status) => {
                return Err(CmdbError::UnexpectedStatus {
                    status,
                    url: redact_token(url),
                })
            }
        }

        let envelope: PagedEnvelope = response.json()?;
        let first_page = self.pages_fetched == 0;
        self.pages_fetched += 1;

        if first_page && envelope.is_vcf() {
            self.buffered
                .extend(envelope.meta.iter().cloned().map(Value::String));
            if let Some(header) = &envelope.header {
                self.buffered.push_back(Value::String(header.clone()));
            }
        }

        let next = envelope.next_url().map(str::to_string);
        self.buffered.extend(envelope.data);
        Ok(next)
    }
}

impl Stream for PagedQuery {
    type Item = Result<Value>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(row) = this.buffered.pop_front() {
                return Poll::Ready(Some(Ok(row)));
            }

            match &mut this.cursor {
                Cursor::Exhausted => return Poll::Ready(None),
                Cursor::Pending(url) => {
                    let url = std::mem::take(url);
                    let request = this.request(&url);
                    this.cursor = Cursor::Fetching { url, request };
                }
                Cursor::Fetching { url, request } => {
                    let response = ready!(request.as_mut().poll(cx));
                    let url = std::mem::take(url);

                    match response.and_then(|response| this.accept_page(&url, response)) {
                        Ok(Some(next)) => this.cursor = Cursor::Pending(next),
                        Ok(None) => this.cursor = Cursor::Exhausted,
                        Err(err) => {
                            this.cursor = Cursor::Exhausted;
                            this.buffered.clear();
                            return Poll::Ready(Some(Err(err)));
                        }
                    }
                }
            }
        }
    }
}

impl fmt::Debug for PagedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedQuery")
            .field("state", &self.state())
            .field("buffered", &self.buffered.len())
            .field("pages_fetched", &self.pages_fetched)
            .finish()
    }
}

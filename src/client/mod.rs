//! CMDB API client implementation.
//!
//! This module provides everything needed to talk to the CMDB API:
//!
//! - **Validate tokens** with the canary lookup
//! - **Look up variants** by chromosome and position
//! - **Stream paged results** by following the server's `next` cursor
//! - **Swap the HTTP layer** for a scripted one in tests
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── fetch     - CmdbClient and the query operations
//! ├── paged     - Lazily paginated query stream
//! ├── transport - HttpTransport trait and the reqwest adapter
//! ├── mock      - Scripted transport for tests
//! ├── config    - Client configuration
//! └── utils     - Status code classification
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CmdbClient`] | Main API client |
//! | [`PagedQuery`] | Single-pass stream of paged rows |
//! | [`HttpTransport`] | Injectable GET/POST capability |
//! | [`QueryResponse`] | Status code + lazily decoded body |
//! | [`ClientConfig`] | Client configuration options |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use cmdb_tools::client::{ClientConfig, CmdbClient};
//!
//! // Default configuration
//! let client = CmdbClient::new().unwrap();
//!
//! // Custom API location
//! let config = ClientConfig::with_api_url("http://localhost:8080/cmdb/api/v1.0");
//! let client = CmdbClient::with_config(config).unwrap();
//! ```
//!
//! ## Classifying Status Codes
//!
//! ```
//! use cmdb_tools::client::{classify_point_status, PointStatus};
//!
//! assert_eq!(classify_point_status(201), PointStatus::Found);
//! assert_eq!(classify_point_status(404), PointStatus::NotFound);
//! ```

mod config;
mod fetch;
mod mock;
mod paged;
mod transport;
mod utils;

pub use config::ClientConfig;
pub use fetch::CmdbClient;
pub use mock::{MockTransport, RecordedRequest};
pub use paged::{PagedQuery, PagedState};
pub use transport::{HttpTransport, QueryResponse, ReqwestTransport};
pub use utils::*;

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # CMDB tools: allele frequencies for VCF files
//!
//! This crate talks to the CMDB variant database API. It stores an access
//! token locally, looks up variants and regions, and annotates VCF files with
//! CMDB allele frequencies.
//!
//! ## Overview
//!
//! The pieces, leaves first:
//!
//! 1. **HTTP transport** - injectable GET/POST capability returning status + body
//! 2. **Credential store** - owner-only YAML record holding the token
//! 3. **Paged queries** - a `Stream` following the server's `next` cursor
//! 4. **Point lookups** - one request per chromosome + position
//! 5. **VCF annotation** - line-by-line rewrite adding `CMDB_*` INFO fields
//!
//! ## Wire conventions
//!
//! - `201 Created` - point lookup executed (also how a token is validated)
//! - `200 OK` - page of a paged query
//! - `400 Bad Request` - paged query rejected, `{"error": ...}` body
//! - `403 Forbidden` - point lookup denied, `{"error": ...}` body
//! - `404 Not Found` - no variant at the position
//!
//! ## Client Usage
//!
//! ```ignore
//! use cmdb_tools::{CmdbClient, CredentialStore, Session};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new(CmdbClient::new()?, CredentialStore::default_location()?);
//!     session.login("my-token").await?;
//!
//!     if let Some(body) = session.query_variant(Some("chr17"), Some(41234470)).await? {
//!         println!("{}", body);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Annotation
//!
//! ```ignore
//! use std::io::stdout;
//! use std::path::Path;
//!
//! let summary = session.annotate(Path::new("calls.vcf.gz"), None, stdout()).await?;
//! eprintln!("{} of {} variants annotated", summary.annotated, summary.data_lines);
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Credential record, page envelope, variant record
//! - **[error]** - Error types and result handling
//! - **[client]** - HTTP transport, point lookups and paged queries
//! - **[credentials]** - Local token storage
//! - **[vcf]** - VCF reading and annotation
//! - **[commands]** - Operations behind the command line
//! - **[protocol]** - Endpoints, constants and header helpers

pub mod client;
pub mod commands;
pub mod credentials;
pub mod error;
pub mod protocol;
pub mod types;
pub mod vcf;

pub use client::{CmdbClient, HttpTransport, PagedQuery, QueryResponse};
pub use commands::Session;
pub use credentials::CredentialStore;
pub use error::{CmdbError, Result};
pub use types::{CmdbVariant, CredentialRecord, PagedEnvelope, Region, VariantId};
pub use vcf::{AnnotationSummary, VcfAnnotator};

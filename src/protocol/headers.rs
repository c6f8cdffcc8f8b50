//! Authorization header handling for the CMDB API.
//!
//! The region endpoint authenticates with a bearer token:
//!
//! | Header | Format | Example |
//! |--------|--------|---------|
//! | Authorization | `Bearer {token}` | `Bearer 3f9a...` |
//!
//! The point lookup endpoint takes the token as a `token` query parameter
//! instead, so it does not go through this module.
//!
//! # Examples
//!
//! ```
//! use cmdb_tools::protocol::{bearer_headers, format_bearer};
//!
//! let headers = bearer_headers("abc123").unwrap();
//! assert_eq!(headers["authorization"], "Bearer abc123");
//!
//! assert_eq!(format_bearer("abc123"), "Bearer abc123");
//! ```

use crate::error::{CmdbError, Result};
use http::header::{HeaderMap, HeaderValue, AUTHORIZATION};

/// Format an `Authorization` header value for a bearer token.
#[inline]
pub fn format_bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Build a header map carrying `Authorization: Bearer {token}`.
///
/// # Errors
///
/// Returns [`CmdbError::InvalidCredential`] if the token contains characters
/// that are not allowed in a header value.
pub fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let value = HeaderValue::from_str(&format_bearer(token)).map_err(|_| {
        CmdbError::InvalidCredential("token is not a valid header value".to_string())
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

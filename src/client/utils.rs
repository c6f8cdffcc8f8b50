//! Status code classification for the CMDB endpoints.
//!
//! The two query styles use different success codes, so each has its own
//! classifier:
//!
//! | Status | Point lookup | Paged query |
//! |--------|--------------|-------------|
//! | 200 | unexpected | page |
//! | 201 | found | unexpected |
//! | 400 | unexpected | query error |
//! | 403 | query error | unexpected |
//! | 404 | not found | unexpected |

use crate::protocol::constants::status;

/// Outcome class of a point variant lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointStatus {
    /// Query executed, body holds the records.
    Found,
    /// No variant at the position.
    NotFound,
    /// Token lacks access, body holds the reason.
    Forbidden,
    /// Anything else.
    Unexpected(u16),
}

/// Outcome class of a paged query page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// Page delivered.
    Page,
    /// Query rejected, body holds the reason.
    BadRequest,
    /// Anything else.
    Unexpected(u16),
}

/// Classify the status of a point lookup response.
pub fn classify_point_status(code: u16) -> PointStatus {
    match code {
        status::QUERY_EXECUTED => PointStatus::Found,
        status::NOT_FOUND => PointStatus::NotFound,
        status::FORBIDDEN => PointStatus::Forbidden,
        other => PointStatus::Unexpected(other),
    }
}

/// Classify the status of a paged query response.
pub fn classify_page_status(code: u16) -> PageStatus {
    match code {
        status::PAGE_OK => PageStatus::Page,
        status::BAD_REQUEST => PageStatus::BadRequest,
        other => PageStatus::Unexpected(other),
    }
}

/// Whether the canary lookup accepted a token.
#[inline]
pub fn is_token_accepted(code: u16) -> bool {
    code == status::QUERY_EXECUTED
}

/// Strip everything from `token=` onwards so URLs can be logged.
pub fn redact_token(url: &str) -> String {
    match url.find("token=") {
        Some(pos) => format!("{}token=***", &url[..pos]),
        None => url.to_string(),
    }
}

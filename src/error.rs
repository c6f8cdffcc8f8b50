//! Error types for CMDB tools.
//!
//! Every failure in the crate is a [`CmdbError`]. The variants follow the
//! taxonomy the command line reports to the user:
//!
//! | Variant | Meaning | Recovery |
//! |---------|---------|----------|
//! | [`CmdbError::Auth`] | Token rejected by the canary lookup | Log in with a valid token |
//! | [`CmdbError::InvalidCredential`] | Local record missing or malformed | Run `login` |
//! | [`CmdbError::NotLoggedIn`] | No local record at all | Run `login` |
//! | [`CmdbError::Query`] | Server reported a 4xx with a message | Fix the query |
//! | [`CmdbError::Parse`] | Response body is not the expected JSON | None |
//! | [`CmdbError::Transport`] / [`CmdbError::UnexpectedStatus`] | Network failure or unexpected status | None |
//!
//! Nothing in the crate retries: a failed request ends the invocation.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CmdbError>;

/// Errors raised by the CMDB client, credential store and VCF annotator.
#[derive(Debug, Error)]
pub enum CmdbError {
    /// The server did not accept the token during login.
    #[error(
        "Error while validating your token with the CMDB API authentication server. \
         You may not have API access or the token is wrong (HTTP {status})."
    )]
    Auth {
        /// Status code returned for the canary lookup.
        status: u16,
    },

    /// The local credential record exists but cannot be used.
    #[error("Invalid or outdated access token ({0}). You may need to run login.")]
    InvalidCredential(String),

    /// No credential record has been written yet.
    #[error("No access tokens found. Please login first.")]
    NotLoggedIn,

    /// The server rejected a query and explained why.
    #[error("{0}")]
    Query(String),

    /// A response body could not be decoded.
    #[error("Failed to parse response body: {0}")]
    Parse(String),

    /// The HTTP exchange itself failed (unreachable host, bad URL, broken body).
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// The server answered with a status the calling operation does not expect.
    #[error("Unexpected HTTP status {status} for {url}")]
    UnexpectedStatus {
        /// Status code received.
        status: u16,
        /// URL that was requested.
        url: String,
    },

    /// A VCF data line could not be split into its positional fields.
    #[error("Malformed VCF data line {line}: {reason}")]
    MalformedVcf {
        /// 1-based input line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Invalid user input or configuration.
    #[error("{0}")]
    InvalidArgument(String),

    /// Local I/O failure (credential file, VCF input, output stream).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CmdbError {
    /// True for failures of the HTTP exchange or an unexpected status code.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CmdbError::Transport(_) | CmdbError::UnexpectedStatus { .. }
        )
    }

    /// True when the user has to (re-)run `login` to recover.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            CmdbError::Auth { .. } | CmdbError::InvalidCredential(_) | CmdbError::NotLoggedIn
        )
    }
}

impl From<serde_json::Error> for CmdbError {
    fn from(err: serde_json::Error) -> Self {
        CmdbError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for CmdbError {
    fn from(err: reqwest::Error) -> Self {
        CmdbError::Transport(err.to_string())
    }
}

impl From<url::ParseError> for CmdbError {
    fn from(err: url::ParseError) -> Self {
        CmdbError::Transport(format!("invalid URL: {}", err))
    }
}

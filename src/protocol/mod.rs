//! CMDB API wire contract: endpoints, constants and header helpers.
//!
//! The API speaks plain HTTP + JSON with a few conventions worth knowing:
//!
//! | Endpoint | Auth | Success status |
//! |----------|------|----------------|
//! | `GET /variant?type=position&query=CHROM-POS` | `token` query parameter | `201` |
//! | `GET /region?chrom=C&start=S&end=E&vcf=0\|1` | `Authorization: Bearer` | `200` |
//!
//! `201` on the point lookup means "query accepted and executed", not
//! "resource created". A `404` there simply means the position is not in the
//! dataset.

pub mod headers;

pub use headers::{bearer_headers, format_bearer};

/// Protocol constants.
pub mod constants {
    /// Default API base URL.
    pub const DEFAULT_API_URL: &str = "https://db.cngb.org/cmdb/api/v1.0";

    /// Dataset version written to the credential record and the VCF header.
    pub const DATASET_VERSION: &str = "CMDB_hg19_v1.0";

    /// Chromosome of the canary lookup used to validate a token.
    pub const CANARY_CHROMOSOME: &str = "chr17";

    /// Position of the canary lookup used to validate a token.
    pub const CANARY_POSITION: u64 = 41_234_470;

    /// Width of a region query, roughly a thousand variants.
    pub const REGION_SPAN: u64 = 8_000;

    /// Message used when the server rejects a query without explaining why.
    pub const DEFAULT_QUERY_ERROR: &str = "Failed to query data.";

    /// Envelope format value for VCF pages.
    pub const FORMAT_VCF: &str = "vcf";

    /// Endpoint paths relative to the base URL.
    pub mod paths {
        /// Point variant lookup.
        pub const VARIANT: &str = "variant";
        /// Paged region query.
        pub const REGION: &str = "region";
    }

    /// Status codes of the wire contract.
    pub mod status {
        /// Paged page delivered.
        pub const PAGE_OK: u16 = 200;
        /// Point query executed.
        pub const QUERY_EXECUTED: u16 = 201;
        /// Malformed paged query.
        pub const BAD_REQUEST: u16 = 400;
        /// Token lacks access.
        pub const FORBIDDEN: u16 = 403;
        /// No variant at the position.
        pub const NOT_FOUND: u16 = 404;
    }
}

/// Join an endpoint path onto the API base URL.
///
/// The base URL ends in a version segment (`.../v1.0`), so a plain
/// [`url::Url::join`] would replace it; the path is appended instead.
///
/// ```
/// use cmdb_tools::protocol::endpoint_url;
///
/// let url = endpoint_url("https://db.cngb.org/cmdb/api/v1.0/", "variant").unwrap();
/// assert_eq!(url.as_str(), "https://db.cngb.org/cmdb/api/v1.0/variant");
/// ```
pub fn endpoint_url(base: &str, path: &str) -> crate::Result<url::Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(url::Url::parse(&joined)?)
}

/// Format the `query` parameter of a position lookup (`CHROM-POS`).
#[inline]
pub fn position_query(chromosome: &str, position: u64) -> String {
    format!("{}-{}", chromosome, position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_keeps_version_segment() {
        let url = endpoint_url(constants::DEFAULT_API_URL, constants::paths::REGION).unwrap();
        assert_eq!(url.as_str(), "https://db.cngb.org/cmdb/api/v1.0/region");
    }

    #[test]
    fn test_endpoint_url_invalid_base() {
        assert!(endpoint_url("not a url", "variant").is_err());
    }

    #[test]
    fn test_position_query() {
        assert_eq!(position_query("chr17", 41234470), "chr17-41234470");
    }
}

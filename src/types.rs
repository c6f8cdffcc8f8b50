//! Core data types shared by the client, the credential store and the VCF
//! annotator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CmdbError, Result};

/// The locally stored credential.
///
/// Serialized as a two-key YAML mapping:
///
/// ```text
/// access_token: 3f9a...
/// version: CMDB_hg19_v1.0
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Token sent to the API.
    pub access_token: String,
    /// Dataset version the token was issued against.
    pub version: String,
}

/// One page of a paged query.
///
/// `meta` and `header` are only meaningful when `format` is `"vcf"`; `next`
/// is the absolute URL of the following page, absent on the last page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PagedEnvelope {
    /// Payload format, `"vcf"` or `"json"`.
    #[serde(default)]
    pub format: String,
    /// VCF meta lines (`##...`).
    #[serde(default)]
    pub meta: Vec<String>,
    /// VCF column header line (`#CHROM...`).
    #[serde(default)]
    pub header: Option<String>,
    /// Rows of this page.
    #[serde(default)]
    pub data: Vec<Value>,
    /// Cursor to the next page.
    #[serde(default)]
    pub next: Option<String>,
}

impl PagedEnvelope {
    /// Whether this page carries VCF text rows.
    pub fn is_vcf(&self) -> bool {
        self.format == crate::protocol::constants::FORMAT_VCF
    }

    /// The next page URL, treating an empty string like a missing cursor.
    pub fn next_url(&self) -> Option<&str> {
        self.next.as_deref().filter(|url| !url.is_empty())
    }
}

/// Allele frequency record returned by the point lookup.
///
/// Values are kept as JSON so they are written to INFO exactly as the server
/// sent them (`0.05` stays `0.05`, `"PASS"` stays `PASS`). Any other fields
/// the server includes are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmdbVariant {
    /// Total number of alleles in samples with coverage.
    pub allele_num: Value,
    /// Alternate allele count.
    pub allele_count: Value,
    /// Alternate allele frequency.
    pub allele_freq: Value,
    /// Dataset filter status.
    pub filter_status: Value,
    /// Remaining fields (chromosome, position, alleles...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CmdbVariant {
    /// Decode the first record of a point lookup body.
    ///
    /// The API answers with a JSON array of records; a bare object is accepted
    /// too. An empty array yields `None`.
    pub fn first_from_body(body: &Value) -> Result<Option<CmdbVariant>> {
        let record = match body {
            Value::Array(items) => match items.first() {
                Some(first) => first,
                None => return Ok(None),
            },
            Value::Object(_) => body,
            other => {
                return Err(CmdbError::Parse(format!(
                    "expected a variant record or an array of records, got {}",
                    other
                )))
            }
        };
        Ok(Some(serde_json::from_value(record.clone())?))
    }

    /// Look up a string field among the extra fields (e.g. `ref`, `alt`).
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// Render a JSON scalar the way it appears in VCF text.
///
/// Strings are written without quotes, `null` becomes `.`, everything else
/// uses its JSON form.
pub fn info_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => ".".to_string(),
        other => other.to_string(),
    }
}

/// Variants of a genomic window, keyed by `variant_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Region {
    /// Chromosome name.
    pub chromosome: String,
    /// First position of the window.
    pub start: u64,
    /// Last position of the window.
    pub end: u64,
    /// Rows of the window.
    pub variants: BTreeMap<String, Value>,
}

/// A variant identifier of the form `CHROM-POS[-REF-ALT]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantId {
    /// Chromosome name.
    pub chromosome: String,
    /// 1-based position.
    pub position: u64,
    /// Reference allele, if given.
    pub reference: Option<String>,
    /// Alternate allele, if given.
    pub alternate: Option<String>,
}

impl VariantId {
    /// Parse `CHROM-POS` or `CHROM-POS-REF-ALT`.
    ///
    /// ```
    /// use cmdb_tools::types::VariantId;
    ///
    /// let id: VariantId = "chr17-41234470-A-G".parse().unwrap();
    /// assert_eq!(id.chromosome, "chr17");
    /// assert_eq!(id.position, 41234470);
    /// assert_eq!(id.alternate.as_deref(), Some("G"));
    /// ```
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || {
            CmdbError::InvalidArgument(format!(
                "Invalid variant identifier '{}': expected CHROM-POS or CHROM-POS-REF-ALT",
                value
            ))
        };

        let parts: Vec<&str> = value.trim().split('-').collect();
        let (chromosome, position, reference, alternate) = match parts.as_slice() {
            [chrom, pos] => (*chrom, *pos, None, None),
            [chrom, pos, reference, alternate] => {
                (*chrom, *pos, Some(*reference), Some(*alternate))
            }
            _ => return Err(invalid()),
        };

        let position: u64 = position.parse().map_err(|_| invalid())?;
        if chromosome.is_empty() || position == 0 {
            return Err(invalid());
        }

        Ok(VariantId {
            chromosome: chromosome.to_string(),
            position,
            reference: reference.map(str::to_string),
            alternate: alternate.map(str::to_string),
        })
    }

    /// Whether a returned record agrees with the alleles of this identifier.
    ///
    /// Records that do not report their alleles are kept.
    pub fn matches(&self, variant: &CmdbVariant) -> bool {
        let agrees = |wanted: &Option<String>, key: &str| match (wanted, variant.extra_str(key)) {
            (Some(wanted), Some(found)) => wanted.eq_ignore_ascii_case(found),
            _ => true,
        };
        agrees(&self.reference, "ref") && agrees(&self.alternate, "alt")
    }
}

impl std::str::FromStr for VariantId {
    type Err = CmdbError;

    fn from_str(s: &str) -> Result<Self> {
        VariantId::parse(s)
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.chromosome, self.position)?;
        if let (Some(reference), Some(alternate)) = (&self.reference, &self.alternate) {
            write!(f, "-{}-{}", reference, alternate)?;
        }
        Ok(())
    }
}

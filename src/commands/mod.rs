//! Operations behind the `cmdbtools` subcommands.
//!
//! A [`Session`] pairs a [`CmdbClient`] with a [`CredentialStore`]. Every
//! operation except [`Session::login`] requires a stored credential and fails
//! with [`CmdbError::NotLoggedIn`] before touching the network otherwise.

use std::io::Write;
use std::path::Path;

use serde_json::Value;

use crate::client::{CmdbClient, PagedQuery};
use crate::credentials::CredentialStore;
use crate::error::{CmdbError, Result};
use crate::protocol::bearer_headers;
use crate::protocol::constants::REGION_SPAN;
use crate::types::{info_value, CmdbVariant, CredentialRecord, Region, VariantId};
use crate::vcf::{
    annotation_entries, info_header_lines, merge_info, open_vcf, AnnotationSummary, VcfAnnotator,
};

/// Column header line of VCF output produced from query results.
pub const VCF_COLUMN_HEADER: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";

/// A client plus the credential store it authenticates from.
#[derive(Debug, Clone)]
pub struct Session {
    client: CmdbClient,
    store: CredentialStore,
}

impl Session {
    /// Create a session.
    pub fn new(client: CmdbClient, store: CredentialStore) -> Self {
        Session { client, store }
    }

    /// The API client.
    pub fn client(&self) -> &CmdbClient {
        &self.client
    }

    /// The credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Validate `token` with the canary lookup and store it.
    ///
    /// Nothing is written when the server rejects the token.
    pub async fn login(&self, token: &str) -> Result<()> {
        self.client.validate_token(token).await?;

        if !self.store.exists() {
            self.store.create()?;
        }
        self.store.write(token)?;
        tracing::info!(path = %self.store.path().display(), "signed in");
        Ok(())
    }

    /// The stored credential.
    pub fn credential(&self) -> Result<CredentialRecord> {
        self.store.read()
    }

    /// The stored access token.
    pub fn access_token(&self) -> Result<String> {
        Ok(self.credential()?.access_token)
    }

    /// Dataset version recorded at login.
    pub fn load_version(&self) -> Result<String> {
        Ok(self.credential()?.version)
    }

    /// Look up a position. Both chromosome and position are required.
    pub async fn query_variant(
        &self,
        chromosome: Option<&str>,
        position: Option<u64>,
    ) -> Result<Option<Value>> {
        let credential = self.credential()?;
        let (chromosome, position) = match (chromosome, position) {
            (Some(chromosome), Some(position)) => (chromosome, position),
            _ => {
                return Err(CmdbError::InvalidArgument(
                    "Provide both \"-c,--chromosome\" and \"-p,--position\".".to_string(),
                ))
            }
        };

        self.client
            .query_variant_by_position(&credential.access_token, chromosome, position)
            .await
    }

    /// Look up a variant identifier.
    ///
    /// When the identifier carries alleles, records reporting different
    /// alleles are dropped. `None` if nothing is left.
    pub async fn query_variant_id(&self, id: &VariantId) -> Result<Option<Value>> {
        let body = self
            .query_variant(Some(id.chromosome.as_str()), Some(id.position))
            .await?;

        Ok(body.and_then(|body| match body {
            Value::Array(records) => {
                let kept: Vec<Value> = records
                    .into_iter()
                    .filter(|record| {
                        serde_json::from_value::<CmdbVariant>(record.clone())
                            .map(|variant| id.matches(&variant))
                            .unwrap_or(true)
                    })
                    .collect();
                (!kept.is_empty()).then_some(Value::Array(kept))
            }
            other => Some(other),
        }))
    }

    /// Stream the rows of `[start, end]` on `chromosome`.
    ///
    /// With `vcf`, the server sends VCF text rows and the stream starts with
    /// its meta and header lines.
    pub fn region_rows(&self, chromosome: &str, start: u64, end: u64, vcf: bool) -> Result<PagedQuery> {
        let credential = self.credential()?;
        let url = self.client.region_url(chromosome, start, end, vcf)?;
        let headers = bearer_headers(&credential.access_token)?;
        Ok(self.client.query_paged(headers, url))
    }

    /// Load the JSON records of the window starting at `position`, keyed by
    /// `variant_id`.
    pub async fn load_region(&self, chromosome: &str, position: u64) -> Result<Region> {
        let start = position;
        let end = start.saturating_add(REGION_SPAN);
        let mut rows = self.region_rows(chromosome, start, end, false)?;

        let mut region = Region {
            chromosome: chromosome.to_string(),
            start,
            end,
            ..Default::default()
        };

        while let Some(row) = rows.next().await {
            let row = row?;
            match row.get("variant_id").and_then(Value::as_str) {
                Some(id) => {
                    region.variants.insert(id.to_string(), row.clone());
                }
                None => tracing::debug!(%row, "skipping region row without variant_id"),
            }
        }

        tracing::info!(
            chromosome,
            start,
            end,
            variants = region.variants.len(),
            pages = rows.pages_fetched(),
            "region loaded"
        );
        Ok(region)
    }

    /// Annotate the VCF at `path` into `output`.
    ///
    /// The credential is checked once before the input is opened. `filter` is
    /// accepted for command line compatibility and not applied.
    pub async fn annotate<W: Write>(
        &self,
        path: &Path,
        filter: Option<&str>,
        output: W,
    ) -> Result<AnnotationSummary> {
        let credential = self.credential()?;
        if let Some(filter) = filter {
            tracing::warn!(filter, "filter expressions are not applied during annotation");
        }

        let reader = open_vcf(path)?;
        VcfAnnotator::new(&self.client, &credential)
            .annotate(reader, output)
            .await
    }
}

/// Render point lookup results as VCF text.
///
/// The output has the CMDB `##INFO` declarations, a column header and one
/// data line per record, with the four CMDB fields as INFO. Alleles come from
/// the record when it reports them, else from `id`, else `.`.
pub fn format_variant_vcf(id: &VariantId, body: &Value, dataset_version: &str) -> Result<Vec<String>> {
    let records = match body {
        Value::Array(records) => records.clone(),
        other => vec![other.clone()],
    };

    let mut lines = vec!["##fileformat=VCFv4.2".to_string()];
    lines.extend(info_header_lines(dataset_version));
    lines.push(VCF_COLUMN_HEADER.to_string());

    for record in records {
        let variant: CmdbVariant = serde_json::from_value(record)?;
        let allele = |key: &str, fallback: &Option<String>| {
            variant
                .extra
                .get(key)
                .map(info_value)
                .or_else(|| fallback.clone())
                .unwrap_or_else(|| ".".to_string())
        };
        let reference = allele("ref", &id.reference);
        let alternate = allele("alt", &id.alternate);
        let info = merge_info(".", annotation_entries(&variant));
        let position = id.position.to_string();

        let columns: [&str; 8] = [
            &id.chromosome,
            &position,
            ".",
            &reference,
            &alternate,
            ".",
            ".",
            &info,
        ];
        lines.push(columns.join("\t"));
    }
    Ok(lines)
}

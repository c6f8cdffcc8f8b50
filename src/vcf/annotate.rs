//! Streaming VCF annotation with CMDB allele frequencies.
//!
//! [`VcfAnnotator`] reads VCF text line by line and writes it back out with
//! four extra INFO fields on every variant the CMDB dataset knows:
//!
//! | Input line | Output |
//! |------------|--------|
//! | `##...` meta line | copied verbatim |
//! | `#CHROM...` column header | four `##INFO` declarations, then the header |
//! | data line, variant found | same columns, INFO merged and sorted |
//! | data line, no variant | copied verbatim |
//!
//! Lines are handled as bytes. Meta lines, comments and unmatched data lines
//! are written back exactly as read, terminator included, so input that is not
//! valid UTF-8 (a Latin-1 sample name, say) passes through untouched. Only
//! CHROM, POS and INFO are decoded.
//!
//! Each data line costs exactly one point lookup, issued sequentially.
//! Running the annotator on its own output annotates again, replacing the
//! `CMDB_*` values.

use std::borrow::Cow;
use std::io::{BufRead, Write};

use crate::client::CmdbClient;
use crate::error::{CmdbError, Result};
use crate::types::{CmdbVariant, CredentialRecord};

use super::info::{annotation_entries, info_header_lines, merge_info};

/// Minimum number of whitespace-separated columns in a data line.
pub const MIN_DATA_COLUMNS: usize = 8;

/// Role of a VCF line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `##` meta-information line.
    Meta,
    /// `#CHROM` column header line.
    ColumnHeader,
    /// Any other `#` line, passed through untouched.
    Comment,
    /// Variant record.
    Data,
}

/// Classify a line by its prefix.
pub fn classify_line(line: &[u8]) -> LineKind {
    if line.starts_with(b"##") {
        LineKind::Meta
    } else if line.starts_with(b"#CHROM") {
        LineKind::ColumnHeader
    } else if line.starts_with(b"#") {
        LineKind::Comment
    } else {
        LineKind::Data
    }
}

/// Split a raw line into its content and its `\n` or `\r\n` terminator.
fn split_terminator(line: &[u8]) -> (&[u8], &[u8]) {
    let content_len = match line {
        [.., b'\r', b'\n'] => line.len() - 2,
        [.., b'\n'] => line.len() - 1,
        _ => line.len(),
    };
    line.split_at(content_len)
}

/// Positional view of a VCF data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLine<'a> {
    fields: Vec<&'a [u8]>,
    chromosome: &'a str,
    position: u64,
}

impl<'a> DataLine<'a> {
    /// Split a data line (without terminator) into its columns.
    ///
    /// `line_no` is only used for error messages.
    ///
    /// # Errors
    ///
    /// [`CmdbError::MalformedVcf`] if there are fewer than eight columns,
    /// CHROM is not UTF-8 or POS is not a positive integer.
    pub fn parse(line: &'a [u8], line_no: usize) -> Result<Self> {
        let malformed = |reason: String| CmdbError::MalformedVcf {
            line: line_no,
            reason,
        };

        let fields: Vec<&[u8]> = line
            .split(|byte| byte.is_ascii_whitespace())
            .filter(|field| !field.is_empty())
            .collect();
        if fields.len() < MIN_DATA_COLUMNS {
            return Err(malformed(format!(
                "expected at least {} columns, found {}",
                MIN_DATA_COLUMNS,
                fields.len()
            )));
        }

        let chromosome = std::str::from_utf8(fields[0])
            .map_err(|_| malformed("chromosome is not valid UTF-8".to_string()))?;

        let position = std::str::from_utf8(fields[1])
            .ok()
            .and_then(|pos| pos.parse::<u64>().ok());
        let position = match position {
            Some(position) if position >= 1 => position,
            _ => {
                return Err(malformed(format!(
                    "invalid position '{}'",
                    String::from_utf8_lossy(fields[1])
                )))
            }
        };

        Ok(DataLine {
            fields,
            chromosome,
            position,
        })
    }

    /// CHROM column.
    pub fn chromosome(&self) -> &'a str {
        self.chromosome
    }

    /// POS column.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// INFO column. Invalid UTF-8 is replaced with `U+FFFD`.
    pub fn info(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.fields[7])
    }

    /// FORMAT and sample columns, if any.
    pub fn remainder(&self) -> &[&'a [u8]] {
        &self.fields[MIN_DATA_COLUMNS..]
    }

    /// Re-assemble the line, tab-separated, with a replacement INFO column.
    pub fn with_info(&self, info: &str) -> Vec<u8> {
        let mut columns: Vec<&[u8]> = Vec::with_capacity(self.fields.len());
        columns.extend_from_slice(&self.fields[..7]);
        columns.push(info.as_bytes());
        columns.extend_from_slice(self.remainder());
        columns.join(&b'\t')
    }
}

/// Counters reported after an annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationSummary {
    /// Input lines read.
    pub lines: usize,
    /// Data lines among them.
    pub data_lines: usize,
    /// Data lines that received CMDB fields.
    pub annotated: usize,
    /// Data lines with no CMDB record.
    pub unmatched: usize,
}

/// Annotates a VCF stream using point lookups.
#[derive(Debug)]
pub struct VcfAnnotator<'a> {
    client: &'a CmdbClient,
    token: &'a str,
    dataset_version: &'a str,
}

impl<'a> VcfAnnotator<'a> {
    /// Annotator using the token and dataset version of a stored credential.
    pub fn new(client: &'a CmdbClient, credential: &'a CredentialRecord) -> Self {
        VcfAnnotator {
            client,
            token: &credential.access_token,
            dataset_version: &credential.version,
        }
    }

    /// Annotate every line of `reader` into `writer`.
    ///
    /// Lines are written as they are processed and keep their original
    /// terminator. The first failing lookup or malformed data line stops the
    /// pass; lines already written stay written.
    pub async fn annotate<R, W>(&self, mut reader: R, mut writer: W) -> Result<AnnotationSummary>
    where
        R: BufRead,
        W: Write,
    {
        let mut summary = AnnotationSummary::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            summary.lines += 1;
            let line_no = summary.lines;
            let (content, terminator) = split_terminator(&buf);

            match classify_line(content) {
                LineKind::Meta | LineKind::Comment => writer.write_all(&buf)?,
                LineKind::ColumnHeader => {
                    for declaration in info_header_lines(self.dataset_version) {
                        writeln!(writer, "{}", declaration)?;
                    }
                    writer.write_all(&buf)?;
                }
                LineKind::Data => {
                    summary.data_lines += 1;
                    match self.annotate_line(content, line_no).await? {
                        Some(annotated) => {
                            summary.annotated += 1;
                            writer.write_all(&annotated)?;
                            writer.write_all(terminator)?;
                        }
                        None => {
                            summary.unmatched += 1;
                            writer.write_all(&buf)?;
                        }
                    }
                }
            }
        }

        writer.flush()?;
        tracing::info!(
            lines = summary.lines,
            data_lines = summary.data_lines,
            annotated = summary.annotated,
            unmatched = summary.unmatched,
            "annotation finished"
        );
        Ok(summary)
    }

    /// Annotate one data line, given without its terminator.
    ///
    /// Returns `None` when CMDB has no record for the position, in which case
    /// the line should be written unchanged.
    pub async fn annotate_line(&self, line: &[u8], line_no: usize) -> Result<Option<Vec<u8>>> {
        let data = DataLine::parse(line, line_no)?;

        let body = self
            .client
            .query_variant_by_position(self.token, data.chromosome(), data.position())
            .await?;

        let variant = match body {
            Some(body) => CmdbVariant::first_from_body(&body)?,
            None => None,
        };

        Ok(variant.map(|variant| {
            let info = merge_info(&data.info(), annotation_entries(&variant));
            data.with_info(&info)
        }))
    }
}

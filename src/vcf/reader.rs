//! Opening VCF input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::Result;

/// Whether a path names gzip-compressed input (by its `.gz` suffix).
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

/// Open a VCF file for line-by-line reading.
///
/// Files ending in `.gz` are decompressed on the fly; multi-member (bgzip)
/// files are read to the end. The file handle is closed when the reader is
/// dropped.
pub fn open_vcf(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    if is_gzip_path(path) {
        tracing::debug!(path = %path.display(), "reading gzip-compressed VCF");
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

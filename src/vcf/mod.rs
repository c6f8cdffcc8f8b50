//! VCF processing: input handling, INFO merging and the annotation pass.
//!
//! Records are handled positionally as bytes; nothing here checks VCF
//! semantics beyond splitting a data line into its columns. Input is expected
//! to be bi-allelic (one ALT per line), so multi-allelic records must be split
//! before annotation.

mod annotate;
mod info;
mod reader;

pub use annotate::{
    classify_line, AnnotationSummary, DataLine, LineKind, VcfAnnotator, MIN_DATA_COLUMNS,
};
pub use info::{
    annotation_entries, info_header_lines, merge_info, ANNOTATION_KEYS, INFO_CMDB_AC,
    INFO_CMDB_AF, INFO_CMDB_AN, INFO_CMDB_FILTER,
};
pub use reader::{is_gzip_path, open_vcf};

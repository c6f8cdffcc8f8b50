//! INFO column handling.

use std::collections::BTreeMap;

use crate::types::{info_value, CmdbVariant};

/// INFO key for the number of alleles in covered samples.
pub const INFO_CMDB_AN: &str = "CMDB_AN";

/// INFO key for the alternate allele count.
pub const INFO_CMDB_AC: &str = "CMDB_AC";

/// INFO key for the alternate allele frequency.
pub const INFO_CMDB_AF: &str = "CMDB_AF";

/// INFO key for the dataset filter status.
pub const INFO_CMDB_FILTER: &str = "CMDB_FILTER";

/// The four annotation keys in header declaration order.
pub const ANNOTATION_KEYS: [&str; 4] = [INFO_CMDB_AN, INFO_CMDB_AC, INFO_CMDB_AF, INFO_CMDB_FILTER];

/// `Number`, `Type` and description prefix of each key in [`ANNOTATION_KEYS`].
const DECLARATIONS: [(&str, &str, &str); 4] = [
    ("1", "Integer", "Number of Alleles in Samples with Coverage"),
    ("A", "Integer", "Alternate Allele Counts in Samples with Coverage"),
    ("A", "Float", "Alternate Allele Frequencies"),
    ("A", "Float", "Filter"),
];

/// `##INFO` declarations for the annotation keys, naming `dataset_version`.
pub fn info_header_lines(dataset_version: &str) -> [String; 4] {
    std::array::from_fn(|i| {
        let (number, kind, description) = DECLARATIONS[i];
        format!(
            "##INFO=<ID={},Number={},Type={},Description=\"{} from {}\">",
            ANNOTATION_KEYS[i], number, kind, description, dataset_version
        )
    })
}

/// The annotation entries for a record, as `(key, "key=value")` pairs.
pub fn annotation_entries(variant: &CmdbVariant) -> [(&'static str, String); 4] {
    let values = [
        &variant.allele_num,
        &variant.allele_count,
        &variant.allele_freq,
        &variant.filter_status,
    ];
    std::array::from_fn(|i| {
        let key = ANNOTATION_KEYS[i];
        (key, format!("{}={}", key, info_value(values[i])))
    })
}

/// Merge annotation entries into an existing INFO column.
///
/// Annotation entries always win. Existing `key[=value]` tokens are kept
/// unless their key is already present; when a key repeats, its first token
/// is kept. An INFO of `.` contributes nothing. The result lists every entry
/// sorted by key, joined with `;`.
///
/// ```
/// use cmdb_tools::vcf::merge_info;
///
/// let merged = merge_info("DP=10;CMDB_AF=0.9;DB", [("CMDB_AF", "CMDB_AF=0.05".to_string())]);
/// assert_eq!(merged, "CMDB_AF=0.05;DB;DP=10");
/// ```
pub fn merge_info<K, I>(info: &str, annotations: I) -> String
where
    K: Into<String>,
    I: IntoIterator<Item = (K, String)>,
{
    let mut merged: BTreeMap<String, String> = annotations
        .into_iter()
        .map(|(key, entry)| (key.into(), entry))
        .collect();

    if info != "." {
        for token in info.split(';').filter(|token| !token.is_empty()) {
            let key = token.split('=').next().unwrap_or(token);
            merged
                .entry(key.to_string())
                .or_insert_with(|| token.to_string());
        }
    }

    merged.into_values().collect::<Vec<_>>().join(";")
}

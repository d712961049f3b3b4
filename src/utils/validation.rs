//! Centralized input limits and pattern checks.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum number of dataset ids a single query may name (DOS protection)
pub const MAX_DATASET_IDS: usize = 1_000;

/// Maximum number of filter expressions in a single query
pub const MAX_FILTERS: usize = 100;

/// Maximum length of any single string field
pub const MAX_FIELD_LENGTH: usize = 10_000;

/// Maximum number of variant records imported from one VCF
pub const MAX_VARIANTS: usize = 5_000_000;

/// Characters that may never appear in dataset ids
pub const FORBIDDEN_CHARS: &[char] = &['<', '>', '\'', '"', '/', ';', '`', '%', '{', '}', '+', '='];

/// Characters that may never appear in filter expressions; comparison operators are allowed
pub const FILTER_FORBIDDEN_CHARS: &[char] = &['\'', '"', '/', ';', '`', '%', '{', '}', '+'];

static ASSEMBLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(GRCh|hg)\d+(\.p\d+)?$").expect("assembly pattern is valid"));

static BASES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ACGTN]+$").expect("bases pattern is valid"));

/// Check an assembly id such as `GRCh38`, `GRCh37.p13` or `hg19`.
///
/// # Examples
///
/// ```
/// use beacon_query::utils::validation::is_valid_assembly;
///
/// assert!(is_valid_assembly("GRCh38"));
/// assert!(is_valid_assembly("GRCh37.p13"));
/// assert!(is_valid_assembly("hg19"));
/// assert!(!is_valid_assembly("GRCh"));
/// assert!(!is_valid_assembly("grch38"));
/// ```
#[must_use]
pub fn is_valid_assembly(s: &str) -> bool {
    ASSEMBLY_RE.is_match(s)
}

/// Check a base string against the `A C G T N` alphabet (upper case, non-empty)
#[must_use]
pub fn is_valid_bases(s: &str) -> bool {
    s.len() <= MAX_FIELD_LENGTH && BASES_RE.is_match(s)
}

/// Check a dataset id for emptiness, length and forbidden characters.
///
/// Returns a description of the first problem found, `None` when the id is acceptable.
#[must_use]
pub fn check_token(s: &str) -> Option<String> {
    check_chars(s, FORBIDDEN_CHARS)
}

/// Like [`check_token`] but allows the `<`, `>` and `=` of comparison operators
#[must_use]
pub fn check_filter_token(s: &str) -> Option<String> {
    check_chars(s, FILTER_FORBIDDEN_CHARS)
}

fn check_chars(s: &str, forbidden: &[char]) -> Option<String> {
    if s.trim().is_empty() {
        return Some("must not be empty".to_string());
    }
    if s.len() > MAX_FIELD_LENGTH {
        return Some(format!("exceeds maximum length of {MAX_FIELD_LENGTH}"));
    }
    if let Some(c) = s.chars().find(|c| forbidden.contains(c) || c.is_control()) {
        return Some(format!("contains forbidden character {c:?}"));
    }
    None
}

/// Check if importing another variant would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new record.
#[must_use]
pub fn check_variant_limit(count: usize) -> Option<String> {
    if count >= MAX_VARIANTS {
        Some(format!(
            "Too many variants: adding another would exceed maximum of {MAX_VARIANTS}"
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembly_pattern() {
        assert!(is_valid_assembly("GRCh38"));
        assert!(is_valid_assembly("GRCh38.p14"));
        assert!(is_valid_assembly("hg38"));
        assert!(!is_valid_assembly("GRCh38.14"));
        assert!(!is_valid_assembly("GRCh38.p"));
        assert!(!is_valid_assembly(" GRCh38"));
        assert!(!is_valid_assembly("CHM13"));
    }

    #[test]
    fn test_bases_alphabet() {
        assert!(is_valid_bases("ACGTN"));
        assert!(is_valid_bases("N"));
        assert!(!is_valid_bases(""));
        assert!(!is_valid_bases("acgt"));
        assert!(!is_valid_bases("ACGU"));
        assert!(!is_valid_bases(&"A".repeat(MAX_FIELD_LENGTH + 1)));
    }

    #[test]
    fn test_check_token() {
        assert_eq!(check_token("EGAD00001000740"), None);
        assert_eq!(check_token("age:>=30"), Some("contains forbidden character '>'".to_string()));
        assert!(check_token("").is_some());
        assert!(check_token("   ").is_some());
        assert!(check_token("a;drop").is_some());
        assert!(check_token("line\nbreak").is_some());
        assert!(check_token(&"x".repeat(MAX_FIELD_LENGTH + 1)).is_some());
    }

    #[test]
    fn test_check_filter_token() {
        assert_eq!(check_filter_token("age:>=30"), None);
        assert_eq!(check_filter_token("sex:female"), None);
        assert_eq!(check_filter_token("bad_filter"), None);
        assert!(check_filter_token("x:1;drop").is_some());
        assert!(check_filter_token("{\"$ne\":1}").is_some());
        assert!(check_filter_token("").is_some());
    }

    #[test]
    fn test_variant_limit() {
        assert!(check_variant_limit(0).is_none());
        assert!(check_variant_limit(MAX_VARIANTS - 1).is_none());
        assert!(check_variant_limit(MAX_VARIANTS).is_some());
    }
}

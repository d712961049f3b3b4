//! Filter expressions: `label:OP value`.
//!
//! `OP` is one of `=`, `>`, `<`, `>=`, `<=`. The ontology form `label:term`
//! (no operator) means equality. Whitespace around the operator is ignored.

use serde_json::Value;
use thiserror::Error;

use crate::core::query::{FilterOperator, FilterTerm};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("missing ':' separator")]
    MissingSeparator,

    #[error("empty label")]
    EmptyLabel,

    #[error("empty value")]
    EmptyValue,
}

/// Parse a single filter expression.
///
/// # Errors
///
/// Returns `FilterParseError` when the expression has no `:`, or when the
/// label or the value is empty.
pub fn parse_filter(expr: &str) -> Result<FilterTerm, FilterParseError> {
    let (label, rest) = expr
        .split_once(':')
        .ok_or(FilterParseError::MissingSeparator)?;
    let label = label.trim();
    if label.is_empty() {
        return Err(FilterParseError::EmptyLabel);
    }

    let rest = rest.trim_start();
    // Two-character operators first so `>=` is not read as `>` followed by `=value`
    let (operator, value) = [
        (">=", FilterOperator::Ge),
        ("<=", FilterOperator::Le),
        ("=", FilterOperator::Eq),
        (">", FilterOperator::Gt),
        ("<", FilterOperator::Lt),
    ]
    .into_iter()
    .find_map(|(token, op)| rest.strip_prefix(token).map(|v| (op, v)))
    .unwrap_or((FilterOperator::Eq, rest));

    let value = value.trim();
    if value.is_empty() {
        return Err(FilterParseError::EmptyValue);
    }

    Ok(FilterTerm::new(label, operator, value))
}

impl FilterTerm {
    /// Whether an attribute value satisfies this term.
    ///
    /// Numbers compare numerically when the term's value parses as a number.
    /// `=` falls back to string equality; ordering operators never match text.
    /// A list matches when any element does.
    #[must_use]
    pub fn matches(&self, attribute: &Value) -> bool {
        match attribute {
            Value::Array(items) => items.iter().any(|item| self.matches_scalar(item)),
            other => self.matches_scalar(other),
        }
    }

    fn matches_scalar(&self, attribute: &Value) -> bool {
        let wanted = self.value.parse::<f64>().ok();
        let actual = match attribute {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };

        if let (Some(actual), Some(wanted)) = (actual, wanted) {
            return match self.operator {
                FilterOperator::Eq => (actual - wanted).abs() < f64::EPSILON,
                FilterOperator::Gt => actual > wanted,
                FilterOperator::Lt => actual < wanted,
                FilterOperator::Ge => actual >= wanted,
                FilterOperator::Le => actual <= wanted,
            };
        }

        if self.operator != FilterOperator::Eq {
            return false;
        }
        match attribute {
            Value::String(s) => s == &self.value,
            Value::Bool(b) => b.to_string() == self.value,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_operators() {
        let cases = [
            ("age:>=30", FilterOperator::Ge, "30"),
            ("age:<=30", FilterOperator::Le, "30"),
            ("age:>30", FilterOperator::Gt, "30"),
            ("age:<30", FilterOperator::Lt, "30"),
            ("age:=30", FilterOperator::Eq, "30"),
            ("age: >= 30", FilterOperator::Ge, "30"),
            ("sex:female", FilterOperator::Eq, "female"),
            ("NCIT:C16576", FilterOperator::Eq, "C16576"),
        ];
        for (expr, op, value) in cases {
            let term = parse_filter(expr).unwrap();
            assert_eq!(term.operator, op, "{expr}");
            assert_eq!(term.value, value, "{expr}");
        }
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(parse_filter("bad_filter"), Err(FilterParseError::MissingSeparator));
        assert_eq!(parse_filter(":30"), Err(FilterParseError::EmptyLabel));
        assert_eq!(parse_filter("age:"), Err(FilterParseError::EmptyValue));
        assert_eq!(parse_filter("age:>="), Err(FilterParseError::EmptyValue));
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let term = parse_filter("ontology:HP:0001250").unwrap();
        assert_eq!(term.label, "ontology");
        assert_eq!(term.value, "HP:0001250");
    }

    #[test]
    fn test_numeric_matching() {
        let ge = parse_filter("age:>=30").unwrap();
        assert!(ge.matches(&json!(30)));
        assert!(ge.matches(&json!(45.5)));
        assert!(!ge.matches(&json!(29)));
        assert!(ge.matches(&json!("31")));

        let eq = parse_filter("age:=30").unwrap();
        assert!(eq.matches(&json!(30)));
        assert!(eq.matches(&json!(30.0)));
    }

    #[test]
    fn test_text_matching() {
        let sex = parse_filter("sex:female").unwrap();
        assert!(sex.matches(&json!("female")));
        assert!(!sex.matches(&json!("male")));
        assert!(!sex.matches(&json!(null)));

        let ordered = parse_filter("sex:>female").unwrap();
        assert!(!ordered.matches(&json!("male")));
    }

    #[test]
    fn test_list_matching() {
        let sex = parse_filter("sex:female").unwrap();
        assert!(sex.matches(&json!(["male", "female"])));
        assert!(!sex.matches(&json!(["male"])));
        assert!(!sex.matches(&json!([])));
    }

    #[test]
    fn test_bool_matching() {
        let flag = parse_filter("consented:true").unwrap();
        assert!(flag.matches(&json!(true)));
        assert!(!flag.matches(&json!(false)));
    }
}

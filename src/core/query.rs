use serde::Serialize;

use crate::core::types::{Chromosome, DatasetId, IncludeDatasetResponses, VariantType};

/// Placeholder base meaning "any allele"
pub const ANY_BASE: &str = "N";

/// How the query places the variant on the reference.
///
/// Exactly one mode is populated; all positions are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinates {
    /// A variant starting exactly at `start`
    Exact { start: u64 },
    /// Any variant overlapping `[start, end)`
    Range { start: u64, end: u64 },
    /// Imprecise breakpoints: start and end each fall within a window
    Fuzzy {
        start_min: u64,
        start_max: u64,
        end_min: u64,
        end_max: u64,
    },
}

impl Coordinates {
    /// Coarse `[first, last]` window that contains every matching record start
    #[must_use]
    pub fn window(&self) -> (u64, u64) {
        match *self {
            Self::Exact { start } => (start, start),
            Self::Range { start, end } => (start, end.max(start.saturating_add(1))),
            Self::Fuzzy {
                start_min, end_max, ..
            } => (start_min, end_max),
        }
    }
}

/// Comparison operator in a filter expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl FilterOperator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }
}

/// A parsed `label:OP value` filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTerm {
    pub label: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterTerm {
    pub fn new(label: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            operator,
            value: value.into(),
        }
    }
}

impl std::fmt::Display for FilterTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ambiguous = self.value.starts_with(['<', '>', '=']);
        if self.operator == FilterOperator::Eq && !ambiguous {
            write!(f, "{}:{}", self.label, self.value)
        } else {
            write!(f, "{}:{}{}", self.label, self.operator.as_str(), self.value)
        }
    }
}

/// The canonical query every downstream component works from
#[derive(Debug, Clone, PartialEq)]
pub struct VariantQuery {
    pub reference_name: Chromosome,
    pub assembly_id: String,
    pub coordinates: Coordinates,
    pub reference_bases: Option<String>,
    pub alternate_bases: Option<String>,
    pub variant_type: Option<VariantType>,
    pub dataset_ids: Vec<DatasetId>,
    pub include_dataset_responses: IncludeDatasetResponses,
    pub filters: Vec<FilterTerm>,
    /// Filter expressions that could not be parsed and were ignored
    pub dropped_filters: Vec<String>,
}

impl VariantQuery {
    /// Reference bases to compare against, `None` when any allele is acceptable
    #[must_use]
    pub fn concrete_reference(&self) -> Option<&str> {
        self.reference_bases.as_deref().filter(|b| *b != ANY_BASE)
    }

    /// Alternate bases to compare against, `None` when any allele is acceptable
    #[must_use]
    pub fn concrete_alternate(&self) -> Option<&str> {
        self.alternate_bases.as_deref().filter(|b| *b != ANY_BASE)
    }

    /// Echo of the request as returned to the client
    #[must_use]
    pub fn echo(&self) -> AlleleRequest {
        AlleleRequest::from(self)
    }
}

/// Query echo carried in every response, with defaults filled in
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlleleRequest {
    pub reference_name: Chromosome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_max: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_max: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_bases: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_bases: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_type: Option<VariantType>,
    pub assembly_id: String,
    pub dataset_ids: Vec<DatasetId>,
    pub include_dataset_responses: IncludeDatasetResponses,
    pub filters: Vec<String>,
}

impl From<&VariantQuery> for AlleleRequest {
    fn from(query: &VariantQuery) -> Self {
        let mut echo = Self {
            reference_name: query.reference_name,
            start: None,
            end: None,
            start_min: None,
            start_max: None,
            end_min: None,
            end_max: None,
            reference_bases: query.reference_bases.clone(),
            alternate_bases: query.alternate_bases.clone(),
            variant_type: query.variant_type,
            assembly_id: query.assembly_id.clone(),
            dataset_ids: query.dataset_ids.clone(),
            include_dataset_responses: query.include_dataset_responses,
            filters: query.filters.iter().map(ToString::to_string).collect(),
        };
        match query.coordinates {
            Coordinates::Exact { start } => echo.start = Some(start),
            Coordinates::Range { start, end } => {
                echo.start = Some(start);
                echo.end = Some(end);
            }
            Coordinates::Fuzzy {
                start_min,
                start_max,
                end_min,
                end_max,
            } => {
                echo.start_min = Some(start_min);
                echo.start_max = Some(start_max);
                echo.end_min = Some(end_min);
                echo.end_max = Some(end_max);
            }
        }
        echo
    }
}

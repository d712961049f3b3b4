//! Structural validation of raw query payloads.
//!
//! A payload is checked against one of two shapes: the SNP shape (a single
//! position and alternate allele) or the structural shape (reference allele,
//! variant type and optional imprecise breakpoints). Unknown fields are
//! rejected rather than ignored.

use serde_json::{Map, Value};

use crate::core::types::{Chromosome, DatasetId, IncludeDatasetResponses, VariantType};
use crate::error::SchemaValidationError;
use crate::utils::validation::{
    check_filter_token, check_token, is_valid_assembly, is_valid_bases, MAX_DATASET_IDS,
    MAX_FILTERS,
};

const COMMON_FIELDS: &[&str] = &[
    "referenceName",
    "assemblyId",
    "referenceBases",
    "alternateBases",
    "start",
    "end",
    "datasetIds",
    "includeDatasetResponses",
    "filters",
];

const STRUCTURAL_ONLY_FIELDS: &[&str] = &["variantType", "startMin", "startMax", "endMin", "endMax"];

const BOUND_FIELDS: [&str; 4] = ["startMin", "startMax", "endMin", "endMax"];

/// Which payload shape a query is validated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryCategory {
    Snp,
    Structural,
}

impl QueryCategory {
    /// Pick the shape from the fields present in the payload.
    ///
    /// Structural when a variant type or any breakpoint bound is given, or when
    /// `end` appears without an alternate allele.
    #[must_use]
    pub fn detect(raw: &Value) -> Self {
        let present = |field: &str| raw.get(field).is_some_and(|v| !v.is_null());
        if present("variantType")
            || BOUND_FIELDS.into_iter().any(|f| present(f))
            || (present("end") && !present("alternateBases"))
        {
            Self::Structural
        } else {
            Self::Snp
        }
    }

    fn allows(self, field: &str) -> bool {
        COMMON_FIELDS.contains(&field)
            || (self == Self::Structural && STRUCTURAL_ONLY_FIELDS.contains(&field))
    }
}

impl std::fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snp => write!(f, "snp"),
            Self::Structural => write!(f, "structural"),
        }
    }
}

/// Fields shared by both shapes; defaults are applied later by the normalizer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionFields {
    pub dataset_ids: Option<Vec<DatasetId>>,
    pub include_dataset_responses: Option<IncludeDatasetResponses>,
    pub filters: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnpQuery {
    pub reference_name: Chromosome,
    pub assembly_id: String,
    pub start: u64,
    pub end: Option<u64>,
    pub reference_bases: Option<String>,
    pub alternate_bases: String,
    pub selection: SelectionFields,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuralQuery {
    pub reference_name: Chromosome,
    pub assembly_id: String,
    pub reference_bases: String,
    pub alternate_bases: Option<String>,
    pub variant_type: Option<VariantType>,
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub start_min: Option<u64>,
    pub start_max: Option<u64>,
    pub end_min: Option<u64>,
    pub end_max: Option<u64>,
    pub selection: SelectionFields,
}

/// A payload that passed validation for its shape
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedQuery {
    Snp(SnpQuery),
    Structural(StructuralQuery),
}

impl ValidatedQuery {
    #[must_use]
    pub fn category(&self) -> QueryCategory {
        match self {
            Self::Snp(_) => QueryCategory::Snp,
            Self::Structural(_) => QueryCategory::Structural,
        }
    }
}

/// Validate a raw JSON payload against the shape for `category`.
///
/// # Errors
///
/// Returns `SchemaValidationError` naming the first offending field: an unknown
/// field, a missing required field, a value of the wrong type, or a value that
/// violates its pattern or enumeration.
pub fn validate(raw: &Value, category: QueryCategory) -> Result<ValidatedQuery, SchemaValidationError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| SchemaValidationError::new("body", "must be a JSON object"))?;

    for key in obj.keys() {
        if key == "mateName" {
            return Err(SchemaValidationError::new(key, "queries using mateName are not supported"));
        }
        if !category.allows(key) {
            return Err(SchemaValidationError::new(
                key,
                format!("unknown field for a {category} query"),
            ));
        }
    }

    let fields = Fields(obj);
    let reference_name = fields.required("referenceName", Fields::chromosome)?;
    let assembly_id = fields.required("assemblyId", Fields::assembly)?;
    let selection = SelectionFields {
        dataset_ids: fields.optional("datasetIds", Fields::dataset_ids)?,
        include_dataset_responses: fields.optional("includeDatasetResponses", Fields::include)?,
        filters: fields.optional("filters", Fields::filters)?,
    };

    match category {
        QueryCategory::Snp => Ok(ValidatedQuery::Snp(SnpQuery {
            reference_name,
            assembly_id,
            start: fields.required("start", Fields::position)?,
            end: fields.optional("end", Fields::position)?,
            reference_bases: fields.optional("referenceBases", Fields::bases)?,
            alternate_bases: fields.required("alternateBases", Fields::bases)?,
            selection,
        })),
        QueryCategory::Structural => {
            let reference_bases = fields.required("referenceBases", Fields::bases)?;
            let alternate_bases = fields.optional("alternateBases", Fields::bases)?;
            let variant_type = fields.optional("variantType", Fields::variant_type)?;

            match (&variant_type, alternate_bases.as_deref()) {
                (None, None) => {
                    return Err(SchemaValidationError::new(
                        "alternateBases",
                        "either alternateBases or variantType is required",
                    ));
                }
                (Some(_), Some(alt)) if alt != "N" => {
                    return Err(SchemaValidationError::new(
                        "alternateBases",
                        "must be absent or 'N' when variantType is given",
                    ));
                }
                _ => {}
            }

            Ok(ValidatedQuery::Structural(StructuralQuery {
                reference_name,
                assembly_id,
                reference_bases,
                alternate_bases,
                variant_type,
                start: fields.optional("start", Fields::position)?,
                end: fields.optional("end", Fields::position)?,
                start_min: fields.optional("startMin", Fields::position)?,
                start_max: fields.optional("startMax", Fields::position)?,
                end_min: fields.optional("endMin", Fields::position)?,
                end_max: fields.optional("endMax", Fields::position)?,
                selection,
            }))
        }
    }
}

/// Typed accessors over the payload object. `null` counts as absent.
struct Fields<'a>(&'a Map<String, Value>);

type Check<T> = fn(&str, &Value) -> Result<T, SchemaValidationError>;

impl Fields<'_> {
    fn optional<T>(&self, field: &str, check: Check<T>) -> Result<Option<T>, SchemaValidationError> {
        match self.0.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => check(field, value).map(Some),
        }
    }

    fn required<T>(&self, field: &str, check: Check<T>) -> Result<T, SchemaValidationError> {
        self.optional(field, check)?
            .ok_or_else(|| SchemaValidationError::new(field, "is required"))
    }

    fn string<'v>(field: &str, value: &'v Value) -> Result<&'v str, SchemaValidationError> {
        value
            .as_str()
            .ok_or_else(|| SchemaValidationError::new(field, "must be a string"))
    }

    fn chromosome(field: &str, value: &Value) -> Result<Chromosome, SchemaValidationError> {
        Self::string(field, value)?
            .parse()
            .map_err(|_| SchemaValidationError::new(field, "must be one of 1-22, X, Y, MT"))
    }

    fn assembly(field: &str, value: &Value) -> Result<String, SchemaValidationError> {
        let s = Self::string(field, value)?;
        if is_valid_assembly(s) {
            Ok(s.to_string())
        } else {
            Err(SchemaValidationError::new(
                field,
                r"must match ^(GRCh|hg)\d+(\.p\d+)?$",
            ))
        }
    }

    fn bases(field: &str, value: &Value) -> Result<String, SchemaValidationError> {
        let s = Self::string(field, value)?;
        if is_valid_bases(s) {
            Ok(s.to_string())
        } else {
            Err(SchemaValidationError::new(field, "must match ^[ACGTN]+$"))
        }
    }

    fn position(field: &str, value: &Value) -> Result<u64, SchemaValidationError> {
        value
            .as_u64()
            .ok_or_else(|| SchemaValidationError::new(field, "must be a non-negative integer"))
    }

    fn variant_type(field: &str, value: &Value) -> Result<VariantType, SchemaValidationError> {
        Self::string(field, value)?
            .parse()
            .map_err(|e: String| SchemaValidationError::new(field, e))
    }

    fn include(field: &str, value: &Value) -> Result<IncludeDatasetResponses, SchemaValidationError> {
        Self::string(field, value)?
            .parse()
            .map_err(|e: String| SchemaValidationError::new(field, e))
    }

    fn string_list<'v>(
        field: &str,
        value: &'v Value,
        max: usize,
    ) -> Result<Vec<&'v str>, SchemaValidationError> {
        let items = value
            .as_array()
            .ok_or_else(|| SchemaValidationError::new(field, "must be an array of strings"))?;
        if items.len() > max {
            return Err(SchemaValidationError::new(
                field,
                format!("must not contain more than {max} entries"),
            ));
        }
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| SchemaValidationError::new(field, "must be an array of strings"))
            })
            .collect()
    }

    fn dataset_ids(field: &str, value: &Value) -> Result<Vec<DatasetId>, SchemaValidationError> {
        Self::string_list(field, value, MAX_DATASET_IDS)?
            .into_iter()
            .map(|id| match check_token(id) {
                Some(problem) => Err(SchemaValidationError::new(field, format!("dataset id {problem}"))),
                None => Ok(DatasetId::new(id)),
            })
            .collect()
    }

    fn filters(field: &str, value: &Value) -> Result<Vec<String>, SchemaValidationError> {
        Self::string_list(field, value, MAX_FILTERS)?
            .into_iter()
            .map(|filter| match check_filter_token(filter) {
                Some(problem) => Err(SchemaValidationError::new(field, format!("filter {problem}"))),
                None => Ok(filter.to_string()),
            })
            .collect()
    }
}

//! Conversion of a validated payload into the canonical [`VariantQuery`].

use tracing::warn;

use crate::core::query::{Coordinates, VariantQuery, ANY_BASE};
use crate::core::types::{Chromosome, VariantType};
use crate::error::SchemaValidationError;
use crate::parsing::filters::parse_filter;
use crate::parsing::schema::{SelectionFields, SnpQuery, StructuralQuery, ValidatedQuery};

/// Resolve coordinates, apply defaults and parse filters.
///
/// Malformed filters are dropped and listed in
/// [`VariantQuery::dropped_filters`]; they never fail the query.
///
/// # Errors
///
/// Returns `SchemaValidationError` when the coordinate fields do not form
/// exactly one complete mode, or when their ordering is inconsistent.
pub fn normalize(validated: ValidatedQuery) -> Result<VariantQuery, SchemaValidationError> {
    match validated {
        ValidatedQuery::Snp(query) => normalize_snp(query),
        ValidatedQuery::Structural(query) => normalize_structural(query),
    }
}

fn normalize_snp(query: SnpQuery) -> Result<VariantQuery, SchemaValidationError> {
    let coordinates = resolve_coordinates(
        Some(query.start),
        query.end,
        [None; 4],
        query.reference_bases.as_deref(),
        None,
    )?;
    Ok(build(
        query.reference_name,
        query.assembly_id,
        coordinates,
        query.reference_bases,
        Some(query.alternate_bases),
        None,
        query.selection,
    ))
}

fn normalize_structural(query: StructuralQuery) -> Result<VariantQuery, SchemaValidationError> {
    let coordinates = resolve_coordinates(
        query.start,
        query.end,
        [query.start_min, query.start_max, query.end_min, query.end_max],
        Some(query.reference_bases.as_str()),
        query.variant_type,
    )?;
    Ok(build(
        query.reference_name,
        query.assembly_id,
        coordinates,
        Some(query.reference_bases),
        query.alternate_bases,
        query.variant_type,
        query.selection,
    ))
}

fn resolve_coordinates(
    start: Option<u64>,
    end: Option<u64>,
    bounds: [Option<u64>; 4],
    reference_bases: Option<&str>,
    variant_type: Option<VariantType>,
) -> Result<Coordinates, SchemaValidationError> {
    let [start_min, start_max, end_min, end_max] = bounds;
    let any_bound = bounds.iter().any(Option::is_some);

    let Some(start) = start else {
        if end.is_some() {
            return Err(SchemaValidationError::new("start", "is required when end is given"));
        }
        let (Some(start_min), Some(start_max), Some(end_min), Some(end_max)) =
            (start_min, start_max, end_min, end_max)
        else {
            let constraint = if any_bound {
                "all of startMin, startMax, endMin and endMax are required"
            } else {
                "either start or all of startMin, startMax, endMin and endMax are required"
            };
            return Err(SchemaValidationError::new("start", constraint));
        };
        if start_min > start_max {
            return Err(SchemaValidationError::new("startMin", "must not be greater than startMax"));
        }
        if end_min > end_max {
            return Err(SchemaValidationError::new("endMin", "must not be greater than endMax"));
        }
        return Ok(Coordinates::Fuzzy {
            start_min,
            start_max,
            end_min,
            end_max,
        });
    };

    if any_bound {
        return Err(SchemaValidationError::new(
            "start",
            "cannot be combined with startMin, startMax, endMin or endMax",
        ));
    }

    match end {
        None if reference_bases == Some(ANY_BASE) => Err(SchemaValidationError::new(
            "referenceBases",
            "cannot be 'N' when start is given without end",
        )),
        None => Ok(Coordinates::Exact { start }),
        Some(end) if end < start && variant_type != Some(VariantType::Bnd) => Err(
            SchemaValidationError::new("end", "must not be smaller than start"),
        ),
        // Breakends may list the mate position first
        Some(end) => Ok(Coordinates::Range {
            start: start.min(end),
            end: start.max(end),
        }),
    }
}

fn build(
    reference_name: Chromosome,
    assembly_id: String,
    coordinates: Coordinates,
    reference_bases: Option<String>,
    alternate_bases: Option<String>,
    variant_type: Option<VariantType>,
    selection: SelectionFields,
) -> VariantQuery {
    let mut filters = Vec::new();
    let mut dropped_filters = Vec::new();
    for expr in selection.filters.unwrap_or_default() {
        match parse_filter(&expr) {
            Ok(term) => filters.push(term),
            Err(e) => {
                warn!(filter = %expr, error = %e, "Dropping malformed filter");
                dropped_filters.push(expr);
            }
        }
    }

    VariantQuery {
        reference_name,
        assembly_id,
        coordinates,
        reference_bases,
        alternate_bases,
        variant_type,
        dataset_ids: selection.dataset_ids.unwrap_or_default(),
        include_dataset_responses: selection.include_dataset_responses.unwrap_or_default(),
        filters,
        dropped_filters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::FilterOperator;
    use crate::core::types::IncludeDatasetResponses;
    use crate::parsing::schema::{validate, QueryCategory};
    use serde_json::{json, Value};

    fn run(raw: &Value) -> Result<VariantQuery, SchemaValidationError> {
        normalize(validate(raw, QueryCategory::detect(raw))?)
    }

    #[test]
    fn test_minimal_snp_defaults() {
        let query = run(&json!({
            "referenceName": "1", "start": 100, "alternateBases": "A", "assemblyId": "GRCh38"
        }))
        .unwrap();
        assert_eq!(query.reference_name, Chromosome::Autosome(1));
        assert_eq!(query.coordinates, Coordinates::Exact { start: 100 });
        assert!(query.dataset_ids.is_empty());
        assert_eq!(query.include_dataset_responses, IncludeDatasetResponses::None);
        assert!(query.filters.is_empty());
        assert!(query.dropped_filters.is_empty());
    }

    #[test]
    fn test_range_and_fuzzy() {
        let range = run(&json!({
            "referenceName": "21", "start": 15399042, "end": 15419114,
            "referenceBases": "G", "variantType": "CNV", "assemblyId": "GRCh37"
        }))
        .unwrap();
        assert_eq!(
            range.coordinates,
            Coordinates::Range {
                start: 15_399_042,
                end: 15_419_114
            }
        );

        let fuzzy = run(&json!({
            "referenceName": "21", "startMin": 1, "startMax": 2, "endMin": 8, "endMax": 9,
            "referenceBases": "T", "variantType": "DEL", "assemblyId": "GRCh37"
        }))
        .unwrap();
        assert!(matches!(fuzzy.coordinates, Coordinates::Fuzzy { start_min: 1, end_max: 9, .. }));
    }

    #[test]
    fn test_coordinate_conflicts() {
        let cases = [
            (json!({"end": 10}), "start"),
            (json!({"start": 1, "startMin": 1}), "start"),
            (json!({"startMin": 1, "startMax": 2}), "start"),
            (json!({}), "start"),
            (json!({"start": 10, "end": 5}), "end"),
            (json!({"startMin": 5, "startMax": 1, "endMin": 8, "endMax": 9}), "startMin"),
            (json!({"startMin": 1, "startMax": 2, "endMin": 9, "endMax": 8}), "endMin"),
        ];
        for (coords, field) in cases {
            let mut raw = json!({
                "referenceName": "2", "referenceBases": "A", "variantType": "DEL", "assemblyId": "hg38"
            });
            for (k, v) in coords.as_object().unwrap() {
                raw[k] = v.clone();
            }
            let err = run(&raw).unwrap_err();
            assert_eq!(err.field, field, "coords {coords}");
        }
    }

    #[test]
    fn test_breakend_may_end_before_start() {
        let query = run(&json!({
            "referenceName": "2", "start": 500, "end": 100,
            "referenceBases": "A", "variantType": "BND", "assemblyId": "GRCh38"
        }))
        .unwrap();
        assert_eq!(query.coordinates, Coordinates::Range { start: 100, end: 500 });
    }

    #[test]
    fn test_wildcard_reference_needs_end() {
        let err = run(&json!({
            "referenceName": "1", "start": 100, "referenceBases": "N",
            "alternateBases": "A", "assemblyId": "GRCh38"
        }))
        .unwrap_err();
        assert_eq!(err.field, "referenceBases");
    }

    #[test]
    fn test_bad_filter_dropped() {
        let query = run(&json!({
            "referenceName": "1", "start": 100, "alternateBases": "A", "assemblyId": "GRCh38",
            "filters": ["bad_filter", "age:>=30", "sex:female"]
        }))
        .unwrap();
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0].operator, FilterOperator::Ge);
        assert_eq!(query.filters[1].label, "sex");
        assert_eq!(query.dropped_filters, vec!["bad_filter".to_string()]);
    }
}

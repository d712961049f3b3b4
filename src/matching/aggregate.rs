use std::collections::BTreeMap;

use crate::core::dataset::VariantRecord;
use crate::core::query::AlleleRequest;
use crate::core::response::{
    BeaconResponse, DatasetMatchResult, ResponseInfo, VariantDetails, VariantFound,
};
use crate::core::types::{DatasetId, IncludeDatasetResponses};
use crate::matching::engine::summarize;

/// Identity of a distinct variant: start, end, reference, alternate, type
type VariantKey = (u64, u64, String, Option<String>, Option<String>);

/// Combine per-dataset results into one response.
///
/// `exists` is true when any dataset hit. The itemized breakdown keeps the
/// results selected by `include`, ordered by dataset id, so the output does
/// not depend on the order in which datasets finished.
pub fn aggregate(
    query: AlleleRequest,
    mut results: Vec<DatasetMatchResult>,
    include: IncludeDatasetResponses,
) -> BeaconResponse {
    let exists = results.iter().any(|r| r.exists);
    let variants_found = variants_found(&results, include);

    results.retain(|r| include.includes(r.exists));
    results.sort_by(|a, b| a.dataset_id.cmp(&b.dataset_id));

    BeaconResponse {
        exists,
        dataset_allele_responses: results,
        query,
        info: ResponseInfo::default(),
        variants_found,
    }
}

fn variant_key(record: &VariantRecord) -> VariantKey {
    (
        record.start,
        record.effective_end(),
        record.reference_bases.clone(),
        record.alternate_bases.clone(),
        record.effective_type().map(|t| t.to_string()),
    )
}

/// Group matching records by distinct variant, ordered by position.
///
/// Each variant carries one result per queried dataset: a hit with that
/// variant's counts, or a miss for datasets that did not hold it. `include`
/// selects which of these are kept, as for the top-level breakdown.
pub fn variants_found(
    results: &[DatasetMatchResult],
    include: IncludeDatasetResponses,
) -> Vec<VariantFound> {
    let mut grouped: BTreeMap<VariantKey, BTreeMap<&DatasetId, Vec<&VariantRecord>>> =
        BTreeMap::new();
    for result in results {
        for record in &result.matched {
            grouped
                .entry(variant_key(record))
                .or_default()
                .entry(&result.dataset_id)
                .or_default()
                .push(record);
        }
    }

    grouped
        .into_values()
        .filter_map(|by_dataset| {
            let representative = *by_dataset.values().flatten().next()?;
            let mut variant_details = VariantDetails::from(representative);
            if variant_details.variant_id.is_none() {
                variant_details.variant_id = by_dataset
                    .values()
                    .flatten()
                    .find_map(|r| r.variant_id.clone());
            }

            let mut dataset_allele_responses: Vec<DatasetMatchResult> = results
                .iter()
                .map(|result| match by_dataset.get(&result.dataset_id) {
                    Some(hits) => summarize(&result.dataset_id, result.access_type, hits),
                    None => DatasetMatchResult::miss(result.dataset_id.clone(), result.access_type),
                })
                .filter(|r| include.includes(r.exists))
                .collect();
            dataset_allele_responses.sort_by(|a, b| a.dataset_id.cmp(&b.dataset_id));

            Some(VariantFound {
                variant_details,
                dataset_allele_responses,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::{Coordinates, VariantQuery};
    use crate::core::types::{AccessLevel, Chromosome, VariantType};

    fn echo() -> AlleleRequest {
        VariantQuery {
            reference_name: Chromosome::Autosome(1),
            assembly_id: "GRCh38".to_string(),
            coordinates: Coordinates::Exact { start: 100 },
            reference_bases: None,
            alternate_bases: Some("G".to_string()),
            variant_type: None,
            dataset_ids: vec![],
            include_dataset_responses: IncludeDatasetResponses::None,
            filters: vec![],
            dropped_filters: vec![],
        }
        .echo()
    }

    fn results() -> Vec<DatasetMatchResult> {
        let hit = DatasetMatchResult {
            dataset_id: DatasetId::new("A"),
            exists: true,
            variant_count: 1,
            frequency: Some(0.5),
            sample_count: None,
            call_count: None,
            access_type: AccessLevel::Public,
            matched: vec![],
        };
        vec![
            DatasetMatchResult::miss(DatasetId::new("C"), AccessLevel::Public),
            hit,
            DatasetMatchResult::miss(DatasetId::new("B"), AccessLevel::Public),
        ]
    }

    fn ids(response: &BeaconResponse) -> Vec<&str> {
        response
            .dataset_allele_responses
            .iter()
            .map(|r| r.dataset_id.as_str())
            .collect()
    }

    #[test]
    fn test_inclusion_policies() {
        let all = aggregate(echo(), results(), IncludeDatasetResponses::All);
        assert!(all.exists);
        assert_eq!(ids(&all), vec!["A", "B", "C"]);

        let hit = aggregate(echo(), results(), IncludeDatasetResponses::Hit);
        assert_eq!(ids(&hit), vec!["A"]);

        let miss = aggregate(echo(), results(), IncludeDatasetResponses::Miss);
        assert_eq!(ids(&miss), vec!["B", "C"]);

        let none = aggregate(echo(), results(), IncludeDatasetResponses::None);
        assert!(none.exists);
        assert!(none.dataset_allele_responses.is_empty());
    }

    #[test]
    fn test_no_results() {
        let response = aggregate(echo(), vec![], IncludeDatasetResponses::All);
        assert!(!response.exists);
        assert!(response.dataset_allele_responses.is_empty());
        assert!(response.info.is_empty());
    }

    #[test]
    fn test_order_independent() {
        let mut reversed = results();
        reversed.reverse();
        let a = aggregate(echo(), results(), IncludeDatasetResponses::All);
        let b = aggregate(echo(), reversed, IncludeDatasetResponses::All);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    fn matched(id: &str, records: Vec<VariantRecord>) -> DatasetMatchResult {
        let hits: Vec<&VariantRecord> = records.iter().collect();
        let mut result = summarize(&DatasetId::new(id), AccessLevel::Public, &hits);
        result.matched = records;
        result
    }

    fn record(start: u64, alt: &str) -> VariantRecord {
        VariantRecord::new(Chromosome::Autosome(1), "GRCh38", start, "A").with_alternate(alt)
    }

    #[test]
    fn test_variants_grouped_across_datasets() {
        let mut shared = record(100, "G");
        shared.frequency = Some(0.25);
        let results = vec![
            matched("B", vec![record(100, "G").with_variant_id("rs1"), record(300, "T")]),
            matched("A", vec![shared]),
            DatasetMatchResult::miss(DatasetId::new("C"), AccessLevel::Public),
        ];

        let found = variants_found(&results, IncludeDatasetResponses::All);
        assert_eq!(found.len(), 2);

        let first = &found[0];
        assert_eq!(first.variant_details.start, 100);
        assert_eq!(first.variant_details.variant_id.as_deref(), Some("rs1"));
        assert_eq!(first.variant_details.variant_type, Some(VariantType::Snp));
        let per_dataset: Vec<(&str, bool)> = first
            .dataset_allele_responses
            .iter()
            .map(|r| (r.dataset_id.as_str(), r.exists))
            .collect();
        assert_eq!(per_dataset, vec![("A", true), ("B", true), ("C", false)]);
        assert_eq!(first.dataset_allele_responses[0].frequency, Some(0.25));
        assert_eq!(first.dataset_allele_responses[1].variant_count, 1);

        let second = &found[1];
        assert_eq!(second.variant_details.start, 300);
        assert_eq!(second.variant_details.alternate_bases.as_deref(), Some("T"));
        let hit_only = variants_found(&results, IncludeDatasetResponses::Hit);
        assert_eq!(hit_only[1].dataset_allele_responses.len(), 1);
        assert_eq!(hit_only[1].dataset_allele_responses[0].dataset_id.as_str(), "B");
    }

    #[test]
    fn test_variants_found_respects_none() {
        let results = vec![matched("A", vec![record(100, "G")])];
        let response = aggregate(echo(), results, IncludeDatasetResponses::None);
        assert_eq!(response.variants_found.len(), 1);
        assert!(response.variants_found[0].dataset_allele_responses.is_empty());
        assert!(response.dataset_allele_responses.is_empty());
    }

    #[test]
    fn test_no_variants_without_hits() {
        let response = aggregate(echo(), results(), IncludeDatasetResponses::All);
        assert!(response.variants_found.is_empty());
    }
}

use serde::Serialize;

use crate::core::dataset::VariantRecord;
use crate::core::query::AlleleRequest;
use crate::core::types::{AccessLevel, Chromosome, DatasetId, VariantType};

/// Outcome of evaluating one dataset against a query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMatchResult {
    pub dataset_id: DatasetId,
    pub exists: bool,
    pub variant_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_count: Option<u64>,
    pub access_type: AccessLevel,
    /// Records that matched, grouped into `variantsFound` by the aggregator
    #[serde(skip)]
    pub matched: Vec<VariantRecord>,
}

impl DatasetMatchResult {
    /// A dataset with no matching variant
    pub fn miss(dataset_id: DatasetId, access_type: AccessLevel) -> Self {
        Self {
            dataset_id,
            exists: false,
            variant_count: 0,
            frequency: None,
            sample_count: None,
            call_count: None,
            access_type,
            matched: Vec::new(),
        }
    }
}

/// The variant a group of matching records describes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub chromosome: Chromosome,
    pub reference_bases: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_bases: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_type: Option<VariantType>,
    pub start: u64,
    pub end: u64,
}

impl From<&VariantRecord> for VariantDetails {
    fn from(record: &VariantRecord) -> Self {
        Self {
            variant_id: record.variant_id.clone(),
            chromosome: record.reference_name,
            reference_bases: record.reference_bases.clone(),
            alternate_bases: record.alternate_bases.clone(),
            variant_type: record.effective_type(),
            start: record.start,
            end: record.effective_end(),
        }
    }
}

/// One distinct matching variant with its per-dataset breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantFound {
    pub variant_details: VariantDetails,
    pub dataset_allele_responses: Vec<DatasetMatchResult>,
}

/// Why a requested dataset was left out of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeReason {
    NotFound,
    AccessDenied,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InaccessibleDataset {
    pub dataset_id: DatasetId,
    pub reason: NoticeReason,
}

/// Non-fatal notes attached to a response
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseInfo {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_accessible: Vec<InaccessibleDataset>,
}

impl ResponseInfo {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.not_accessible.is_empty()
    }
}

/// Final answer to a variant query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconResponse {
    pub exists: bool,
    pub dataset_allele_responses: Vec<DatasetMatchResult>,
    pub query: AlleleRequest,
    #[serde(skip_serializing_if = "ResponseInfo::is_empty")]
    pub info: ResponseInfo,
    /// Per-variant view, rendered only by the genomic endpoints
    #[serde(skip)]
    pub variants_found: Vec<VariantFound>,
}

impl BeaconResponse {
    /// Datasets that reported a hit, in response order
    pub fn hits(&self) -> impl Iterator<Item = &DatasetMatchResult> {
        self.dataset_allele_responses.iter().filter(|r| r.exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_has_no_optional_counts() {
        let miss = DatasetMatchResult::miss(DatasetId::new("D1"), AccessLevel::Public);
        let json = serde_json::to_value(&miss).unwrap();
        assert_eq!(json["datasetId"], "D1");
        assert_eq!(json["exists"], false);
        assert_eq!(json["variantCount"], 0);
        assert_eq!(json["accessType"], "PUBLIC");
        assert!(json.get("frequency").is_none());
        assert!(json.get("sampleCount").is_none());
        assert!(json.get("matched").is_none());
    }

    #[test]
    fn test_variant_details_from_record() {
        let record = VariantRecord::new(Chromosome::Y, "GRCh37", 2_655_179, "G")
            .with_alternate("A")
            .with_variant_id("rs11575897");
        let json = serde_json::to_value(VariantDetails::from(&record)).unwrap();
        assert_eq!(json["variantId"], "rs11575897");
        assert_eq!(json["chromosome"], "Y");
        assert_eq!(json["variantType"], "SNP");
        assert_eq!(json["start"], 2_655_179);
        assert_eq!(json["end"], 2_655_180);
    }

    #[test]
    fn test_notice_reason_names() {
        let notice = InaccessibleDataset {
            dataset_id: DatasetId::new("D9"),
            reason: NoticeReason::AccessDenied,
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["reason"], "ACCESS_DENIED");
    }
}

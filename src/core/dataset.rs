use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::types::{AccessLevel, Chromosome, DatasetId, VariantType};

/// A dataset exposed by the beacon.
///
/// Datasets are read-only during a query; the store hands out clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Stable identifier (e.g. an EGA accession)
    pub id: DatasetId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Owning organization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    /// Reference assembly the dataset's coordinates refer to
    pub assembly_id: String,

    pub access_level: AccessLevel,

    #[serde(default)]
    pub variant_count: u64,

    #[serde(default)]
    pub sample_count: u64,

    #[serde(default)]
    pub call_count: u64,

    /// Attribute labels present on this dataset's variants; filter terms whose
    /// label is not listed here are ignored for this dataset.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub attribute_labels: BTreeSet<String>,
}

impl Dataset {
    pub fn new(id: impl Into<String>, assembly_id: impl Into<String>, access_level: AccessLevel) -> Self {
        Self {
            id: DatasetId::new(id),
            name: None,
            description: None,
            organization_id: None,
            assembly_id: assembly_id.into(),
            access_level,
            variant_count: 0,
            sample_count: 0,
            call_count: 0,
            attribute_labels: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn knows_attribute(&self, label: &str) -> bool {
        self.attribute_labels.contains(label)
    }
}

/// One stored variant row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// External identifier such as a dbSNP rsID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,

    pub reference_name: Chromosome,

    pub assembly_id: String,

    /// 0-based start
    pub start: u64,

    /// Exclusive end; absent for small variants, which span their reference allele
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,

    pub reference_bases: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate_bases: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_type: Option<VariantType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_count: Option<u64>,

    /// Per-variant attributes that filter terms are evaluated against
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl VariantRecord {
    pub fn new(
        reference_name: Chromosome,
        assembly_id: impl Into<String>,
        start: u64,
        reference_bases: impl Into<String>,
    ) -> Self {
        Self {
            variant_id: None,
            reference_name,
            assembly_id: assembly_id.into(),
            start,
            end: None,
            reference_bases: reference_bases.into(),
            alternate_bases: None,
            variant_type: None,
            frequency: None,
            sample_count: None,
            call_count: None,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_variant_id(mut self, id: impl Into<String>) -> Self {
        self.variant_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_alternate(mut self, alternate: impl Into<String>) -> Self {
        self.alternate_bases = Some(alternate.into());
        self
    }

    #[must_use]
    pub fn with_end(mut self, end: u64) -> Self {
        self.end = Some(end);
        self
    }

    #[must_use]
    pub fn with_type(mut self, variant_type: VariantType) -> Self {
        self.variant_type = Some(variant_type);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, label: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(label.into(), value);
        self
    }

    /// Exclusive end of the span this record covers
    #[must_use]
    pub fn effective_end(&self) -> u64 {
        self.end.unwrap_or_else(|| {
            let len = self.reference_bases.len().max(1) as u64;
            self.start.saturating_add(len)
        })
    }

    /// Declared variant type, or one inferred from the alleles
    #[must_use]
    pub fn effective_type(&self) -> Option<VariantType> {
        if self.variant_type.is_some() {
            return self.variant_type;
        }
        let alt = self.alternate_bases.as_deref()?;
        let (ref_len, alt_len) = (self.reference_bases.len(), alt.len());
        Some(match ref_len.cmp(&alt_len) {
            std::cmp::Ordering::Equal if ref_len == 1 => VariantType::Snp,
            std::cmp::Ordering::Equal => VariantType::Mnp,
            std::cmp::Ordering::Less => VariantType::Ins,
            std::cmp::Ordering::Greater => VariantType::Del,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_end() {
        let snp = VariantRecord::new(Chromosome::Autosome(1), "GRCh38", 100, "A").with_alternate("G");
        assert_eq!(snp.effective_end(), 101);

        let del = VariantRecord::new(Chromosome::Autosome(1), "GRCh38", 100, "ACGT").with_alternate("A");
        assert_eq!(del.effective_end(), 104);

        let sv = VariantRecord::new(Chromosome::Autosome(1), "GRCh38", 100, "N")
            .with_end(5_000)
            .with_type(VariantType::Del);
        assert_eq!(sv.effective_end(), 5_000);
    }

    #[test]
    fn test_effective_end_saturates() {
        let last = VariantRecord::new(Chromosome::Autosome(1), "GRCh38", u64::MAX - 1, "ACGT");
        assert_eq!(last.effective_end(), u64::MAX);
    }

    #[test]
    fn test_effective_type_inference() {
        let base = VariantRecord::new(Chromosome::X, "GRCh37", 10, "A");
        assert_eq!(base.clone().with_alternate("T").effective_type(), Some(VariantType::Snp));
        assert_eq!(
            VariantRecord::new(Chromosome::X, "GRCh37", 10, "AC")
                .with_alternate("GT")
                .effective_type(),
            Some(VariantType::Mnp)
        );
        assert_eq!(base.clone().with_alternate("ATT").effective_type(), Some(VariantType::Ins));
        assert_eq!(
            VariantRecord::new(Chromosome::X, "GRCh37", 10, "ATT")
                .with_alternate("A")
                .effective_type(),
            Some(VariantType::Del)
        );
        assert_eq!(base.effective_type(), None);
    }

    #[test]
    fn test_declared_type_wins() {
        let record = VariantRecord::new(Chromosome::Autosome(2), "GRCh38", 10, "A")
            .with_alternate("ATTT")
            .with_type(VariantType::InsMe);
        assert_eq!(record.effective_type(), Some(VariantType::InsMe));
    }

    #[test]
    fn test_dataset_catalog_shape() {
        let json = r#"{
            "id": "EGAD00001000740",
            "assembly_id": "GRCh37",
            "access_level": "PUBLIC",
            "sample_count": 12
        }"#;
        let dataset: Dataset = serde_json::from_str(json).unwrap();
        assert_eq!(dataset.id, DatasetId::new("EGAD00001000740"));
        assert_eq!(dataset.access_level, AccessLevel::Public);
        assert_eq!(dataset.variant_count, 0);
        assert!(!dataset.knows_attribute("sex"));
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::core::dataset::{Dataset, VariantRecord};
use crate::core::types::{AccessLevel, Chromosome, DatasetId};
use crate::error::{StorageError, StorageResult};

use super::index::VariantIndex;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Duplicate dataset id in catalog: {0}")]
    DuplicateDataset(DatasetId),

    #[error("Unknown dataset: {0}")]
    UnknownDataset(DatasetId),
}

impl From<CatalogError> for StorageError {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err.to_string())
    }
}

/// Catalog version for compatibility checking
pub const CATALOG_VERSION: &str = "1.0.0";

/// Coarse positional window handed to the store.
///
/// Every record that could match the query starts within `[start, end]` or
/// overlaps `start`; the matcher applies the exact rules afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionLookup {
    pub reference_name: Chromosome,
    pub assembly_id: String,
    pub start: u64,
    pub end: u64,
}

/// Read access to datasets and their variants
#[async_trait]
pub trait VariantStore: Send + Sync {
    /// Returns a human-readable name for this backend.
    fn backend_name(&self) -> &'static str;

    /// Datasets whose access level is at most `visible_to`, sorted by id
    async fn list_datasets(&self, visible_to: AccessLevel) -> StorageResult<Vec<Dataset>>;

    async fn get_dataset(&self, id: &DatasetId) -> StorageResult<Option<Dataset>>;

    /// Candidate records of one dataset inside the lookup window
    async fn query_variants(
        &self,
        id: &DatasetId,
        lookup: &RegionLookup,
    ) -> StorageResult<Vec<VariantRecord>>;
}

/// One dataset as written in a catalog file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEntry {
    #[serde(flatten)]
    pub dataset: Dataset,
    #[serde(default)]
    pub variants: Vec<VariantRecord>,
}

/// Serializable catalog format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogData {
    pub version: String,
    pub created_at: String,
    pub datasets: Vec<DatasetEntry>,
}

/// In-memory variant store backed by a JSON catalog
#[derive(Debug, Default)]
pub struct CatalogStore {
    /// All datasets, sorted by id
    datasets: Vec<Dataset>,

    /// Index: dataset ID -> index in datasets vec
    id_to_index: HashMap<DatasetId, usize>,

    /// Positional index per dataset
    variants: HashMap<DatasetId, VariantIndex>,
}

impl CatalogStore {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the embedded demo catalog
    pub fn load_embedded() -> Result<Self, CatalogError> {
        // Embedded at compile time via build.rs
        const EMBEDDED_CATALOG: &str = include_str!("../../catalogs/demo_catalog.json");
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Load catalog from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse catalog from JSON string
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != CATALOG_VERSION {
            warn!(
                expected = CATALOG_VERSION,
                found = %data.version,
                "Catalog version mismatch"
            );
        }

        let mut catalog = Self::new();
        for entry in data.datasets {
            catalog.add_dataset(entry.dataset, entry.variants)?;
        }
        Ok(catalog)
    }

    /// Add a new dataset with its variants.
    ///
    /// Attribute labels and a missing variant count are derived from the records.
    pub fn add_dataset(
        &mut self,
        mut dataset: Dataset,
        variants: Vec<VariantRecord>,
    ) -> Result<(), CatalogError> {
        if self.id_to_index.contains_key(&dataset.id) {
            return Err(CatalogError::DuplicateDataset(dataset.id));
        }

        let foreign = variants
            .iter()
            .filter(|v| v.assembly_id != dataset.assembly_id)
            .count();
        if foreign > 0 {
            warn!(
                dataset = %dataset.id,
                assembly = %dataset.assembly_id,
                count = foreign,
                "Dataset has variants on a different assembly"
            );
        }

        let index = VariantIndex::build(variants);
        dataset.attribute_labels.extend(index.attribute_labels());
        if dataset.variant_count == 0 {
            dataset.variant_count = index.len() as u64;
        }

        self.variants.insert(dataset.id.clone(), index);
        let pos = self.datasets.partition_point(|d| d.id < dataset.id);
        self.datasets.insert(pos, dataset);
        self.reindex();
        Ok(())
    }

    /// Append variants to an existing dataset
    pub fn add_variants(
        &mut self,
        id: &DatasetId,
        variants: Vec<VariantRecord>,
    ) -> Result<(), CatalogError> {
        let idx = *self
            .id_to_index
            .get(id)
            .ok_or_else(|| CatalogError::UnknownDataset(id.clone()))?;
        let index = self.variants.entry(id.clone()).or_default();

        let added = variants.len() as u64;
        index.extend(variants);

        let dataset = &mut self.datasets[idx];
        dataset.attribute_labels.extend(index.attribute_labels());
        dataset.variant_count += added;
        Ok(())
    }

    fn reindex(&mut self) {
        self.id_to_index = self
            .datasets
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();
    }

    /// Get a dataset by ID
    pub fn get(&self, id: &DatasetId) -> Option<&Dataset> {
        self.id_to_index.get(id).map(|&idx| &self.datasets[idx])
    }

    /// Get a mutable dataset by ID
    pub fn get_mut(&mut self, id: &DatasetId) -> Option<&mut Dataset> {
        let idx = *self.id_to_index.get(id)?;
        self.datasets.get_mut(idx)
    }

    /// All datasets, sorted by id
    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    /// Every variant of one dataset, grouped by chromosome and sorted by start
    pub fn variants(&self, id: &DatasetId) -> Vec<VariantRecord> {
        self.variants
            .get(id)
            .map(VariantIndex::records)
            .unwrap_or_default()
    }

    /// Export catalog to JSON
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let data = CatalogData {
            version: CATALOG_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            datasets: self
                .datasets
                .iter()
                .map(|d| DatasetEntry {
                    dataset: d.clone(),
                    variants: self
                        .variants
                        .get(&d.id)
                        .map(VariantIndex::records)
                        .unwrap_or_default(),
                })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    /// Number of datasets in catalog
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Check if catalog is empty
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

#[async_trait]
impl VariantStore for CatalogStore {
    fn backend_name(&self) -> &'static str {
        "catalog"
    }

    async fn list_datasets(&self, visible_to: AccessLevel) -> StorageResult<Vec<Dataset>> {
        Ok(self
            .datasets
            .iter()
            .filter(|d| d.access_level <= visible_to)
            .cloned()
            .collect())
    }

    async fn get_dataset(&self, id: &DatasetId) -> StorageResult<Option<Dataset>> {
        Ok(self.get(id).cloned())
    }

    async fn query_variants(
        &self,
        id: &DatasetId,
        lookup: &RegionLookup,
    ) -> StorageResult<Vec<VariantRecord>> {
        let index = self
            .variants
            .get(id)
            .ok_or_else(|| StorageError::Query(format!("no variant index for dataset {id}")))?;
        Ok(index.lookup(lookup))
    }
}

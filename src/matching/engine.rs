use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::catalog::store::{RegionLookup, VariantStore};
use crate::core::dataset::{Dataset, VariantRecord};
use crate::core::query::{Coordinates, VariantQuery};
use crate::core::response::DatasetMatchResult;
use crate::core::types::{AccessLevel, DatasetId};
use crate::error::StorageError;

/// Decimal places kept for reported allele frequencies
pub const FREQUENCY_DECIMALS: i32 = 4;

/// Evaluates one dataset at a time against a query
#[derive(Debug, Clone)]
pub struct VariantMatcher {
    /// Shared pool bounding storage reads in flight
    permits: Arc<Semaphore>,
    /// Pause before the single retry of a transient fault
    retry_backoff: Duration,
}

impl VariantMatcher {
    pub fn new(permits: Arc<Semaphore>, retry_backoff: Duration) -> Self {
        Self {
            permits,
            retry_backoff,
        }
    }

    /// Fetch candidates for `dataset` and evaluate them.
    ///
    /// A transient storage fault is retried once after the backoff. A permit
    /// from the shared pool is held only while the store is being read.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the read fails with a non-transient fault,
    /// or when the retry fails too.
    pub async fn match_dataset(
        &self,
        store: &dyn VariantStore,
        dataset: &Dataset,
        query: &VariantQuery,
    ) -> Result<DatasetMatchResult, StorageError> {
        let lookup = region_lookup(query);

        let records = match self.read(store, dataset, &lookup).await {
            Err(e) if e.is_transient() => {
                warn!(
                    dataset = %dataset.id,
                    backend = store.backend_name(),
                    error = %e,
                    backoff_ms = self.retry_backoff.as_millis() as u64,
                    "Transient storage fault, retrying once"
                );
                tokio::time::sleep(self.retry_backoff).await;
                self.read(store, dataset, &lookup).await?
            }
            other => other?,
        };

        Ok(Self::match_records(dataset, query, &records))
    }

    async fn read(
        &self,
        store: &dyn VariantStore,
        dataset: &Dataset,
        lookup: &RegionLookup,
    ) -> Result<Vec<VariantRecord>, StorageError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| StorageError::Unavailable("connection pool closed".to_string()))?;
        store.query_variants(&dataset.id, lookup).await
    }

    /// Evaluate already-fetched records; pure
    pub fn match_records(
        dataset: &Dataset,
        query: &VariantQuery,
        records: &[VariantRecord],
    ) -> DatasetMatchResult {
        let hits: Vec<&VariantRecord> = records
            .iter()
            .filter(|r| record_matches(dataset, query, r))
            .collect();

        debug!(
            dataset = %dataset.id,
            candidates = records.len(),
            hits = hits.len(),
            "Matched dataset"
        );

        let mut result = summarize(&dataset.id, dataset.access_level, &hits);
        result.matched = hits.into_iter().cloned().collect();
        result
    }
}

/// Counts for a set of matching records from one dataset.
///
/// The highest frequency is reported, rounded; sample and call counts are
/// summed over the records that report them.
pub fn summarize(
    dataset_id: &DatasetId,
    access_type: AccessLevel,
    hits: &[&VariantRecord],
) -> DatasetMatchResult {
    if hits.is_empty() {
        return DatasetMatchResult::miss(dataset_id.clone(), access_type);
    }

    let frequency = hits
        .iter()
        .filter_map(|r| r.frequency)
        .fold(None, |acc: Option<f64>, f| Some(acc.map_or(f, |a| a.max(f))))
        .map(round_frequency);

    DatasetMatchResult {
        dataset_id: dataset_id.clone(),
        exists: true,
        variant_count: hits.len() as u64,
        frequency,
        sample_count: sum_reported(hits.iter().map(|r| r.sample_count)),
        call_count: sum_reported(hits.iter().map(|r| r.call_count)),
        access_type,
        matched: Vec::new(),
    }
}

/// Coarse storage window covering every record the query could match
pub fn region_lookup(query: &VariantQuery) -> RegionLookup {
    let (start, end) = query.coordinates.window();
    RegionLookup {
        reference_name: query.reference_name,
        assembly_id: query.assembly_id.clone(),
        start,
        end,
    }
}

/// Whether one record satisfies every part of the query
pub fn record_matches(dataset: &Dataset, query: &VariantQuery, record: &VariantRecord) -> bool {
    record.reference_name == query.reference_name
        && record.assembly_id == query.assembly_id
        && position_matches(&query.coordinates, record)
        && alleles_match(query, record)
        && filters_match(dataset, query, record)
}

fn position_matches(coordinates: &Coordinates, record: &VariantRecord) -> bool {
    let record_end = record.effective_end();
    match *coordinates {
        Coordinates::Exact { start } => record.start == start,
        Coordinates::Range { start, end } => {
            let end = end.max(start.saturating_add(1));
            record.start < end && record_end > start
        }
        Coordinates::Fuzzy {
            start_min,
            start_max,
            end_min,
            end_max,
        } => {
            (start_min..=start_max).contains(&record.start)
                && (end_min..=end_max).contains(&record_end)
        }
    }
}

fn alleles_match(query: &VariantQuery, record: &VariantRecord) -> bool {
    if let Some(alt) = query.concrete_alternate() {
        if record.alternate_bases.as_deref() != Some(alt) {
            return false;
        }
    }
    if let Some(reference) = query.concrete_reference() {
        if record.reference_bases != reference {
            return false;
        }
    }
    match query.variant_type {
        Some(class) => record
            .effective_type()
            .is_some_and(|actual| class.covers(actual)),
        None => true,
    }
}

fn filters_match(dataset: &Dataset, query: &VariantQuery, record: &VariantRecord) -> bool {
    query.filters.iter().all(|term| {
        // Labels the dataset does not carry cannot be evaluated
        if !dataset.knows_attribute(&term.label) {
            return true;
        }
        record
            .attributes
            .get(&term.label)
            .is_some_and(|value| term.matches(value))
    })
}

fn round_frequency(f: f64) -> f64 {
    let scale = 10f64.powi(FREQUENCY_DECIMALS);
    (f * scale).round() / scale
}

/// Sum of the values that are present, `None` when no record reports one
fn sum_reported(values: impl Iterator<Item = Option<u64>>) -> Option<u64> {
    values
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0u64).saturating_add(v)))
}

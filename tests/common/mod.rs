//! Shared fixtures: a scriptable `VariantStore` and small builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use beacon_query::catalog::store::{RegionLookup, VariantStore};
use beacon_query::error::{StorageError, StorageResult};
use beacon_query::{AccessLevel, BeaconService, Chromosome, Dataset, DatasetId, QueryConfig, VariantRecord};
use serde_json::{json, Value};

/// How a dataset's reads fail
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// Every read fails with a transient error
    Unavailable,
    /// The first read fails with a transient error, later reads succeed
    UnavailableOnce,
    /// Every read fails with a non-transient error
    Query,
    /// The read panics
    Panic,
}

/// In-memory store that can be slowed down or made to fail per dataset
#[derive(Default)]
pub struct MockStore {
    datasets: Vec<Dataset>,
    records: HashMap<DatasetId, Vec<VariantRecord>>,
    faults: HashMap<DatasetId, Fault>,
    delay: Duration,
    attempts: Mutex<HashMap<DatasetId, usize>>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

struct InFlight {
    counter: Arc<AtomicUsize>,
}

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, dataset: Dataset, records: Vec<VariantRecord>) -> Self {
        self.records.insert(dataset.id.clone(), records);
        self.datasets.push(dataset);
        self
    }

    pub fn with_fault(mut self, id: &str, fault: Fault) -> Self {
        self.faults.insert(DatasetId::new(id), fault);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn attempts(&self, id: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(&DatasetId::new(id))
            .copied()
            .unwrap_or(0)
    }

    /// Most reads observed in flight at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VariantStore for MockStore {
    fn backend_name(&self) -> &'static str {
        "mock"
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
        Ok(self.datasets.iter().find(|d| &d.id == id).cloned())
    }

    async fn query_variants(
        &self,
        id: &DatasetId,
        lookup: &RegionLookup,
    ) -> StorageResult<Vec<VariantRecord>> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(id.clone()).or_insert(0);
            *n += 1;
            *n
        };
        let _guard = InFlight::enter(&self.in_flight, &self.peak);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.faults.get(id) {
            Some(Fault::Unavailable) => {
                Err(StorageError::Unavailable("connection pool exhausted".into()))
            }
            Some(Fault::UnavailableOnce) if attempt == 1 => {
                Err(StorageError::Unavailable("connection reset".into()))
            }
            Some(Fault::Query) => Err(StorageError::Query(
                "relation \"variants\" does not exist".into(),
            )),
            Some(Fault::Panic) => panic!("index out of bounds in dataset {id}"),
            _ => Ok(self
                .records
                .get(id)
                .map(|records| {
                    records
                        .iter()
                        .filter(|r| {
                            r.reference_name == lookup.reference_name
                                && r.assembly_id == lookup.assembly_id
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()),
        }
    }
}

pub fn public(id: &str) -> Dataset {
    Dataset::new(id, "GRCh38", AccessLevel::Public)
}

/// A chr1 SNV on GRCh38 with reference `A`
pub fn snv(start: u64, alternate: &str) -> VariantRecord {
    VariantRecord::new(Chromosome::Autosome(1), "GRCh38", start, "A").with_alternate(alternate)
}

/// Minimal SNP query for chr1:`start` A>G
pub fn snp_query(start: u64) -> Value {
    json!({
        "referenceName": "1",
        "start": start,
        "referenceBases": "A",
        "alternateBases": "G",
        "assemblyId": "GRCh38"
    })
}

pub fn fast_config() -> QueryConfig {
    QueryConfig {
        max_concurrency: 4,
        query_timeout: Duration::from_secs(5),
        retry_backoff: Duration::from_millis(10),
    }
}

pub fn service(store: &Arc<MockStore>, config: QueryConfig) -> BeaconService {
    BeaconService::new(store.clone(), config)
}

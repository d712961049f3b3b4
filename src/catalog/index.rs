use std::collections::HashMap;

use crate::core::dataset::VariantRecord;
use crate::core::types::Chromosome;

use super::store::RegionLookup;

/// Records of one chromosome/assembly pair, sorted by start
#[derive(Debug, Clone, Default)]
struct Bucket {
    records: Vec<VariantRecord>,
    /// Longest `effective_end - start` in this bucket
    max_span: u64,
}

/// Per-dataset positional index over variant records.
///
/// Records are bucketed by `(chromosome, assembly)` and sorted by start. The
/// longest span in a bucket bounds how far before a window a record can start
/// and still overlap it, so lookups are a binary search plus a short scan.
#[derive(Debug, Clone, Default)]
pub struct VariantIndex {
    buckets: HashMap<(Chromosome, String), Bucket>,
    len: usize,
}

impl VariantIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from unsorted records
    pub fn build(records: Vec<VariantRecord>) -> Self {
        let mut index = Self::new();
        index.extend(records);
        index
    }

    /// Add records, keeping every touched bucket sorted
    pub fn extend(&mut self, records: Vec<VariantRecord>) {
        let mut touched = Vec::new();
        for record in records {
            let key = (record.reference_name, record.assembly_id.clone());
            let bucket = self.buckets.entry(key.clone()).or_default();
            bucket.max_span = bucket
                .max_span
                .max(record.effective_end().saturating_sub(record.start));
            bucket.records.push(record);
            touched.push(key);
            self.len += 1;
        }
        touched.sort();
        touched.dedup();
        for key in touched {
            if let Some(bucket) = self.buckets.get_mut(&key) {
                bucket.records.sort_by_key(|r| r.start);
            }
        }
    }

    /// Records that may overlap the lookup window `[start, end]`
    pub fn lookup(&self, lookup: &RegionLookup) -> Vec<VariantRecord> {
        let key = (lookup.reference_name, lookup.assembly_id.clone());
        let Some(bucket) = self.buckets.get(&key) else {
            return Vec::new();
        };

        let earliest = lookup.start.saturating_sub(bucket.max_span);
        let first = bucket.records.partition_point(|r| r.start < earliest);

        bucket.records[first..]
            .iter()
            .take_while(|r| r.start <= lookup.end)
            .filter(|r| r.start >= lookup.start || r.effective_end() > lookup.start)
            .cloned()
            .collect()
    }

    /// All records, grouped by bucket and sorted by start within each
    pub fn records(&self) -> Vec<VariantRecord> {
        let mut keys: Vec<_> = self.buckets.keys().collect();
        keys.sort();
        keys.into_iter()
            .flat_map(|k| self.buckets[k].records.iter().cloned())
            .collect()
    }

    /// Distinct attribute labels across all records
    pub fn attribute_labels(&self) -> std::collections::BTreeSet<String> {
        self.buckets
            .values()
            .flat_map(|b| b.records.iter())
            .flat_map(|r| r.attributes.keys().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

//! Variant matching and response aggregation.
//!
//! - [`engine::VariantMatcher`]: evaluates one dataset against a query
//! - [`aggregate::aggregate`]: folds per-dataset results into a [`BeaconResponse`]
//!
//! ## Matching
//!
//! The store is asked for a coarse window around the query (see
//! [`engine::region_lookup`]) and the matcher refines the candidates:
//!
//! 1. **Position**: exact start, half-open range overlap, or fuzzy bounds on
//!    both ends
//! 2. **Alleles**: concrete bases must be equal, `N` matches anything
//! 3. **Variant class**: `CNV` covers deletions and duplications, `DEL`
//!    covers `DEL:ME` and so on
//! 4. **Filters**: every term must hold, labels the dataset does not carry
//!    are ignored
//!
//! ## Example
//!
//! ```rust,no_run
//! use beacon_query::core::dataset::{Dataset, VariantRecord};
//! use beacon_query::core::query::{Coordinates, VariantQuery};
//! use beacon_query::core::types::{AccessLevel, Chromosome, IncludeDatasetResponses};
//! use beacon_query::matching::aggregate::aggregate;
//! use beacon_query::matching::engine::VariantMatcher;
//!
//! let dataset = Dataset::new("D1", "GRCh38", AccessLevel::Public);
//! let records = vec![
//!     VariantRecord::new(Chromosome::Autosome(1), "GRCh38", 100, "A").with_alternate("G"),
//! ];
//! let query = VariantQuery {
//!     reference_name: Chromosome::Autosome(1),
//!     assembly_id: "GRCh38".to_string(),
//!     coordinates: Coordinates::Exact { start: 100 },
//!     reference_bases: None,
//!     alternate_bases: Some("G".to_string()),
//!     variant_type: None,
//!     dataset_ids: vec![],
//!     include_dataset_responses: IncludeDatasetResponses::All,
//!     filters: vec![],
//!     dropped_filters: vec![],
//! };
//!
//! let result = VariantMatcher::match_records(&dataset, &query, &records);
//! let response = aggregate(query.echo(), vec![result], query.include_dataset_responses);
//! assert!(response.exists);
//! ```
//!
//! [`BeaconResponse`]: crate::core::response::BeaconResponse

pub mod aggregate;
pub mod engine;

//! # beacon-query
//!
//! A library and server for answering genomic variant presence queries, in
//! the style of a GA4GH Beacon.
//!
//! A Beacon answers one question: "does any dataset I hold contain this
//! variant?" Queries arrive as loosely-typed JSON (chromosome, position or
//! range, alleles, assembly, optional dataset and attribute filters), and the
//! answer is a boolean, optionally itemized per dataset, that honors each
//! dataset's access level.
//!
//! ## Features
//!
//! - **Strict validation**: SNP and structural query shapes, unknown fields rejected
//! - **Normalization**: exact, range and fuzzy coordinates as one closed enum
//! - **Access control**: PUBLIC, REGISTERED and CONTROLLED datasets behind bearer tokens
//! - **Concurrent matching**: one task per dataset, bounded storage reads, one deadline
//! - **Variant classes**: `CNV` covers deletions and duplications, `N` matches any allele
//! - **Attribute filters**: `age:>=30`, `sex:female`, ignored for datasets without the label
//! - **VCF import**: build catalogs from plain or gzipped VCFs
//!
//! ## Example
//!
//! ```rust,no_run
//! use beacon_query::{AuthContext, BeaconService, CatalogStore, QueryConfig};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! // Load the embedded demo catalog
//! let store = CatalogStore::load_embedded()?;
//! let service = BeaconService::new(Arc::new(store), QueryConfig::default());
//!
//! let query = json!({
//!     "referenceName": "Y",
//!     "start": 2655179,
//!     "referenceBases": "G",
//!     "alternateBases": "A",
//!     "assemblyId": "GRCh37",
//!     "includeDatasetResponses": "HIT"
//! });
//!
//! let response = service.handle_query(&query, &AuthContext::anonymous()).await?;
//! for hit in response.hits() {
//!     println!("{}: {} variant(s)", hit.dataset_id, hit.variant_count);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`parsing`]: Query validation, normalization, filter grammar and VCF import
//! - [`access`]: Bearer tokens and dataset visibility
//! - [`catalog`]: Dataset catalog storage and indexing
//! - [`matching`]: Variant matcher and response aggregation
//! - [`service`]: End-to-end query orchestration
//! - [`core`]: Core data types for datasets, variants, queries and responses
//! - [`cli`]: Command-line interface implementation
//! - [`web`]: HTTP API

pub mod access;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod matching;
pub mod parsing;
pub mod service;
pub mod utils;
pub mod web;

// Re-export commonly used types for convenience
pub use access::AuthContext;
pub use catalog::store::{CatalogStore, RegionLookup, VariantStore};
pub use config::{BeaconInfo, QueryConfig};
pub use core::dataset::{Dataset, VariantRecord};
pub use core::query::VariantQuery;
pub use core::response::{BeaconResponse, DatasetMatchResult};
pub use core::types::*;
pub use error::{BeaconError, SchemaValidationError, StorageError};
pub use matching::engine::VariantMatcher;
pub use service::BeaconService;

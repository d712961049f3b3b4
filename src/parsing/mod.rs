//! Turning raw input into validated, canonical values.
//!
//! - [`schema`]: shape validation of raw query payloads (SNP or structural)
//! - [`normalize`]: coordinate resolution and defaults, producing a [`crate::core::query::VariantQuery`]
//! - [`filters`]: the `label:OP value` filter grammar and its evaluation
//! - [`vcf`]: import of VCF data lines as catalog records
//!
//! ## Example
//!
//! ```rust
//! use beacon_query::parsing::normalize::normalize;
//! use beacon_query::parsing::schema::{validate, QueryCategory};
//! use serde_json::json;
//!
//! let raw = json!({"referenceName": "1", "start": 100, "alternateBases": "A", "assemblyId": "GRCh38"});
//! let query = normalize(validate(&raw, QueryCategory::detect(&raw)).unwrap()).unwrap();
//! assert!(query.dataset_ids.is_empty());
//! ```

pub mod filters;
pub mod normalize;
pub mod schema;
pub mod vcf;

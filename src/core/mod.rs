//! Core data types for variant presence queries.
//!
//! - [`types`]: closed vocabularies (chromosome, variant type, access level, inclusion policy)
//! - [`dataset`]: datasets and the variant rows stored for them
//! - [`query`]: the normalized [`query::VariantQuery`] and its echo
//! - [`response`]: per-dataset results and the aggregated [`response::BeaconResponse`]
//!
//! ## Coordinates
//!
//! All positions are 0-based. Range ends are exclusive, so a single-base
//! variant at `start` occupies `[start, start + 1)`.

pub mod dataset;
pub mod query;
pub mod response;
pub mod types;

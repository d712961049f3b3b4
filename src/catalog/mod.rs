//! Dataset catalog storage and indexing.
//!
//! The catalog holds datasets together with their variant records. An embedded
//! demo catalog is compiled into the binary, but custom catalogs can also be
//! loaded from JSON files or built from VCFs with `beacon catalog import`.
//!
//! Query code only sees the [`store::VariantStore`] trait; [`store::CatalogStore`]
//! is the in-memory implementation.
//!
//! ## Example
//!
//! ```rust,no_run
//! use beacon_query::catalog::store::CatalogStore;
//! use beacon_query::core::types::DatasetId;
//! use std::path::Path;
//!
//! // Load embedded catalog
//! let catalog = CatalogStore::load_embedded().unwrap();
//! for dataset in catalog.datasets() {
//!     println!("{} ({})", dataset.id, dataset.access_level);
//! }
//!
//! // Export to JSON and load it back from a file
//! let json = catalog.to_json().unwrap();
//! std::fs::write("my_catalog.json", json).unwrap();
//! let custom = CatalogStore::load_from_file(Path::new("my_catalog.json")).unwrap();
//! assert!(custom.get(&DatasetId::new("EGAD00001000740")).is_some());
//! ```

pub mod index;
pub mod store;

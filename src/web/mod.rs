//! HTTP API for the beacon.
//!
//! ## Starting the Server
//!
//! ```text
//! # Start on the default port 5050 with the embedded demo catalog
//! beacon serve
//!
//! # Custom catalog, tokens and limits
//! beacon serve --catalog my_catalog.json --tokens tokens.json --query-timeout 10
//!
//! # Bind to all interfaces
//! beacon serve --address 0.0.0.0
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /`, `GET /info` - Beacon metadata and the datasets visible to the caller
//! - `GET /service-info` - GA4GH service-info document
//! - `GET|POST /query` - Variant query, SNP or structural detected from the fields
//! - `GET|POST /genomic_snp` - Variant query validated as a SNP query
//! - `GET|POST /genomic_region` - Variant query validated as a structural query
//! - `GET /filtering_terms` - Attribute labels usable in `filters`
//! - `GET /datasets/{id}` - Metadata for one dataset
//!
//! Requests may carry `Authorization: Bearer <token>`; tokens come from the
//! file passed with `--tokens`.

pub mod server;

//! Command-line interface for the beacon.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **serve**: Run the HTTP API
//! - **query**: Answer one variant query against a catalog
//! - **catalog**: List, show, export, or import datasets
//!
//! ## Usage
//!
//! ```text
//! # Serve the embedded demo catalog
//! beacon serve
//!
//! # One query, itemized per dataset
//! beacon query '{"referenceName":"Y","start":2655179,"alternateBases":"A","assemblyId":"GRCh37","includeDatasetResponses":"ALL"}'
//!
//! # Query from a file, as JSON
//! beacon query @request.json --format json
//!
//! # Add a VCF to a catalog
//! beacon catalog import calls.vcf.gz --dataset MY_DATASET --assembly GRCh38 --output my_catalog.json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    QueryConfig, DEFAULT_MAX_CONCURRENCY, DEFAULT_PORT, DEFAULT_QUERY_TIMEOUT_SECS,
    DEFAULT_RETRY_BACKOFF_MS,
};

pub mod catalog;
pub mod query;

#[derive(Parser)]
#[command(name = "beacon")]
#[command(version)]
#[command(about = "Answer genomic variant presence queries over a dataset catalog")]
#[command(
    long_about = "beacon answers \"does any dataset contain this variant?\" for SNP and structural variant queries.\n\nIt serves the GA4GH Beacon API over HTTP, can answer single queries from the command line, and manages the JSON catalog of datasets and variants it queries."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve(ServeArgs),

    /// Run a single variant query
    Query(query::QueryArgs),

    /// Manage the dataset catalog
    Catalog(catalog::CatalogArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "BEACON_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, env = "BEACON_HOST", default_value = "127.0.0.1")]
    pub address: String,

    /// Catalog file (defaults to the embedded demo catalog)
    #[arg(long, env = "BEACON_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Beacon metadata file (defaults to the embedded metadata)
    #[arg(long, env = "BEACON_INFO")]
    pub info: Option<PathBuf>,

    /// Bearer token file; without one every caller is anonymous
    #[arg(long, env = "BEACON_TOKENS")]
    pub tokens: Option<PathBuf>,

    /// Field access levels file (defaults to the embedded levels)
    #[arg(long, env = "BEACON_ACCESS_LEVELS")]
    pub access_levels: Option<PathBuf>,

    /// Storage reads allowed in flight at once
    #[arg(long, env = "BEACON_MAX_CONCURRENCY", default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Per-query deadline in seconds
    #[arg(long, env = "BEACON_QUERY_TIMEOUT", default_value_t = DEFAULT_QUERY_TIMEOUT_SECS)]
    pub query_timeout: u64,

    /// Pause before retrying a transient storage fault, in milliseconds
    #[arg(long, env = "BEACON_RETRY_BACKOFF_MS", default_value_t = DEFAULT_RETRY_BACKOFF_MS)]
    pub retry_backoff_ms: u64,
}

impl ServeArgs {
    #[must_use]
    pub fn query_config(&self) -> QueryConfig {
        QueryConfig {
            max_concurrency: self.max_concurrency,
            query_timeout: Duration::from_secs(self.query_timeout),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

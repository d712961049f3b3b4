use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, ValueEnum};
use serde_json::Value;

use crate::access::AuthContext;
use crate::catalog::store::CatalogStore;
use crate::cli::OutputFormat;
use crate::config::{QueryConfig, DEFAULT_QUERY_TIMEOUT_SECS};
use crate::core::response::BeaconResponse;
use crate::core::types::DatasetId;
use crate::parsing::schema::QueryCategory;
use crate::service::BeaconService;

#[derive(Args)]
pub struct QueryArgs {
    /// Query as inline JSON, `@path` to read a file, or `-` for stdin
    #[arg(required = true)]
    pub request: String,

    /// Path to custom catalog file
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Query shape to validate against
    #[arg(long, default_value = "auto")]
    pub category: CategoryArg,

    /// Query as an authenticated user (sees REGISTERED datasets)
    #[arg(long)]
    pub authenticated: bool,

    /// Grant access to a CONTROLLED dataset; implies --authenticated
    #[arg(long = "token-permission", value_name = "DATASET_ID")]
    pub permissions: Vec<String>,

    /// Query deadline in seconds
    #[arg(long, default_value_t = DEFAULT_QUERY_TIMEOUT_SECS)]
    pub timeout: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CategoryArg {
    Auto,
    Snp,
    Structural,
}

impl QueryArgs {
    fn auth(&self) -> AuthContext {
        if self.authenticated || !self.permissions.is_empty() {
            AuthContext::authenticated(self.permissions.iter().map(DatasetId::new))
        } else {
            AuthContext::anonymous()
        }
    }
}

pub fn run(args: QueryArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let payload = read_request(&args.request)?;

    let store = if let Some(path) = &args.catalog {
        CatalogStore::load_from_file(path)?
    } else {
        CatalogStore::load_embedded()?
    };

    if verbose {
        eprintln!("Loaded catalog with {} datasets", store.len());
    }

    let config = QueryConfig {
        query_timeout: Duration::from_secs(args.timeout),
        ..QueryConfig::default()
    };
    config.validate()?;

    let service = BeaconService::new(Arc::new(store), config);
    let auth = args.auth();

    let rt = tokio::runtime::Runtime::new()?;
    let response = rt.block_on(async {
        match args.category {
            CategoryArg::Auto => service.handle_query(&payload, &auth).await,
            CategoryArg::Snp => {
                service
                    .handle_query_as(&payload, &auth, QueryCategory::Snp)
                    .await
            }
            CategoryArg::Structural => {
                service
                    .handle_query_as(&payload, &auth, QueryCategory::Structural)
                    .await
            }
        }
    })?;

    match format {
        OutputFormat::Text => print_text_response(&response),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Tsv => print_tsv_response(&response),
    }

    Ok(())
}

/// Read the request argument: inline JSON, `@file`, or `-` for stdin
fn read_request(request: &str) -> anyhow::Result<Value> {
    let text = if request == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else if let Some(path) = request.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read query file {path}"))?
    } else {
        request.to_string()
    };

    serde_json::from_str(&text).context("Query is not valid JSON")
}

fn print_text_response(response: &BeaconResponse) {
    println!(
        "{} {}:{} ({})",
        if response.exists { "FOUND" } else { "NOT FOUND" },
        response.query.reference_name,
        describe_position(response),
        response.query.assembly_id,
    );

    if !response.dataset_allele_responses.is_empty() {
        println!();
        for r in &response.dataset_allele_responses {
            let mut line = format!(
                "   {} [{}] {} variant(s)",
                r.dataset_id,
                r.access_type,
                r.variant_count
            );
            if let Some(f) = r.frequency {
                line.push_str(&format!(", frequency {f}"));
            }
            if let Some(n) = r.sample_count {
                line.push_str(&format!(", {n} sample(s)"));
            }
            println!("{line}");
        }
    }

    for notice in &response.info.not_accessible {
        eprintln!(
            "Note: dataset {} skipped ({:?})",
            notice.dataset_id, notice.reason
        );
    }
    for warning in &response.info.warnings {
        eprintln!("Warning: {warning}");
    }
}

fn describe_position(response: &BeaconResponse) -> String {
    let q = &response.query;
    match (q.start, q.end, q.start_min, q.end_max) {
        (Some(start), Some(end), _, _) => format!("{start}-{end}"),
        (Some(start), None, _, _) => start.to_string(),
        (None, _, Some(start_min), Some(end_max)) => format!("{start_min}~{end_max}"),
        _ => "?".to_string(),
    }
}

fn print_tsv_response(response: &BeaconResponse) {
    println!("dataset_id\texists\tvariant_count\tfrequency\tsample_count\tcall_count\taccess_type");
    for r in &response.dataset_allele_responses {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.dataset_id,
            r.exists,
            r.variant_count,
            r.frequency.map(|f| f.to_string()).unwrap_or_default(),
            r.sample_count.map(|n| n.to_string()).unwrap_or_default(),
            r.call_count.map(|n| n.to_string()).unwrap_or_default(),
            r.access_type,
        );
    }
}

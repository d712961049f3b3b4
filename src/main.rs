use clap::Parser;
use tracing_subscriber::EnvFilter;

use beacon_query::cli;
use beacon_query::web;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag, RUST_LOG otherwise
    let filter = if cli.verbose {
        EnvFilter::new("beacon_query=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("beacon_query=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Serve(args) => {
            web::server::run(args)?;
        }
        cli::Commands::Query(args) => {
            cli::query::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Catalog(args) => {
            cli::catalog::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}

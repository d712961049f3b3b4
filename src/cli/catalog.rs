use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::catalog::store::CatalogStore;
use crate::cli::OutputFormat;
use crate::core::dataset::{Dataset, VariantRecord};
use crate::core::types::{AccessLevel, DatasetId};
use crate::parsing::vcf::parse_vcf_file;
use crate::utils::validation::{check_token, is_valid_assembly};

/// Variants printed by `show --variants` unless `--all` is given
const SHOWN_VARIANTS: usize = 25;

#[derive(Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommands,
}

#[derive(Subcommand)]
pub enum CatalogCommands {
    /// List all datasets in the catalog
    List {
        /// Path to custom catalog file
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Filter by assembly (e.g., "GRCh38")
        #[arg(long)]
        assembly: Option<String>,

        /// Filter by access level
        #[arg(long)]
        access: Option<AccessLevel>,
    },

    /// Show details of a specific dataset
    Show {
        /// Dataset ID
        #[arg(required = true)]
        id: String,

        /// Path to custom catalog file
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// List the dataset's variants
        #[arg(long)]
        variants: bool,

        /// With --variants, list every variant
        #[arg(long)]
        all: bool,
    },

    /// Export the catalog to a file
    Export {
        /// Output file path
        #[arg(required = true)]
        output: PathBuf,

        /// Path to custom catalog file to export (defaults to embedded)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Import variants from a VCF (plain, gzip or bgzip) into a dataset
    Import {
        /// VCF file
        #[arg(required = true)]
        input: PathBuf,

        /// Dataset to create or extend
        #[arg(long, required = true)]
        dataset: String,

        /// Assembly the VCF is aligned to (e.g., "GRCh38")
        #[arg(long, required = true)]
        assembly: String,

        /// Display name for a new dataset
        #[arg(long)]
        name: Option<String>,

        /// Description for a new dataset
        #[arg(long)]
        description: Option<String>,

        /// Access level for a new dataset
        #[arg(long, default_value = "PUBLIC")]
        access: AccessLevel,

        /// Catalog to extend (defaults to a new, empty catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Output catalog file
        #[arg(short, long, required = true)]
        output: PathBuf,
    },
}

pub fn run(args: CatalogArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    match args.command {
        CatalogCommands::List {
            catalog,
            assembly,
            access,
        } => run_list(catalog, assembly.as_deref(), access, format, verbose),
        CatalogCommands::Show {
            id,
            catalog,
            variants,
            all,
        } => run_show(&id, catalog, variants, all, format),
        CatalogCommands::Export { output, catalog } => run_export(output, catalog),
        CatalogCommands::Import {
            input,
            dataset,
            assembly,
            name,
            description,
            access,
            catalog,
            output,
        } => run_import(
            ImportOptions {
                input,
                dataset,
                assembly,
                name,
                description,
                access,
                catalog,
                output,
            },
            verbose,
        ),
    }
}

fn load_catalog(catalog_path: Option<PathBuf>) -> anyhow::Result<CatalogStore> {
    Ok(if let Some(path) = catalog_path {
        CatalogStore::load_from_file(&path)?
    } else {
        CatalogStore::load_embedded()?
    })
}

fn run_list(
    catalog_path: Option<PathBuf>,
    assembly_filter: Option<&str>,
    access_filter: Option<AccessLevel>,
    format: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let catalog = load_catalog(catalog_path)?;

    if verbose {
        eprintln!("Loaded catalog with {} datasets", catalog.len());
    }

    let filtered: Vec<&Dataset> = catalog
        .datasets()
        .iter()
        .filter(|d| {
            assembly_filter.map_or(true, |a| d.assembly_id.eq_ignore_ascii_case(a))
                && access_filter.map_or(true, |level| d.access_level == level)
        })
        .collect();

    match format {
        OutputFormat::Text => {
            let id_width = filtered
                .iter()
                .map(|d| d.id.as_str().len())
                .max()
                .unwrap_or(2)
                .max(2);
            let name_width = filtered
                .iter()
                .map(|d| d.name.as_deref().unwrap_or("-").len().min(35))
                .max()
                .unwrap_or(4)
                .max(4);

            let total_width = id_width + name_width + 10 + 10 + 10 + 10 + 5;

            println!("Dataset Catalog ({} datasets)\n", filtered.len());
            println!(
                "{:<id_w$} {:<name_w$} {:<10} {:<10} {:>10} {:>10}",
                "ID",
                "Name",
                "Assembly",
                "Access",
                "Variants",
                "Samples",
                id_w = id_width,
                name_w = name_width,
            );
            println!("{}", "-".repeat(total_width));

            for d in &filtered {
                println!(
                    "{:<id_w$} {:<name_w$} {:<10} {:<10} {:>10} {:>10}",
                    d.id.as_str(),
                    truncate(d.name.as_deref().unwrap_or("-"), name_width),
                    d.assembly_id,
                    d.access_level.to_string(),
                    d.variant_count,
                    d.sample_count,
                    id_w = id_width,
                    name_w = name_width,
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&filtered)?);
        }
        OutputFormat::Tsv => {
            println!("id\tname\tassembly_id\taccess_level\tvariant_count\tsample_count\tcall_count");
            for d in &filtered {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    d.id,
                    d.name.as_deref().unwrap_or(""),
                    d.assembly_id,
                    d.access_level,
                    d.variant_count,
                    d.sample_count,
                    d.call_count,
                );
            }
        }
    }

    Ok(())
}

fn run_show(
    id: &str,
    catalog_path: Option<PathBuf>,
    show_variants: bool,
    all: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let catalog = load_catalog(catalog_path)?;

    let dataset_id = DatasetId::new(id);
    let dataset = catalog
        .get(&dataset_id)
        .ok_or_else(|| anyhow::anyhow!("Dataset '{}' not found", id))?;
    let variants = if show_variants {
        catalog.variants(&dataset_id)
    } else {
        Vec::new()
    };

    match format {
        OutputFormat::Text => {
            println!("Dataset: {}\n", dataset.name.as_deref().unwrap_or(id));
            println!("ID:        {}", dataset.id);
            println!("Assembly:  {}", dataset.assembly_id);
            println!("Access:    {}", dataset.access_level);
            println!("Variants:  {}", dataset.variant_count);
            println!("Samples:   {}", dataset.sample_count);
            println!("Calls:     {}", dataset.call_count);

            if let Some(desc) = &dataset.description {
                println!("\nDescription: {desc}");
            }

            if !dataset.attribute_labels.is_empty() {
                let labels: Vec<&str> = dataset.attribute_labels.iter().map(String::as_str).collect();
                println!("\nFilterable attributes: {}", labels.join(", "));
            }

            if show_variants {
                let shown = if all {
                    &variants[..]
                } else {
                    &variants[..variants.len().min(SHOWN_VARIANTS)]
                };

                println!("\nVariants:");
                println!("{:<6} {:>12} {:>12} {:<10} {:<10} {:<10}", "Chrom", "Start", "End", "Ref", "Alt", "Type");
                println!("{}", "-".repeat(66));
                for v in shown {
                    println!(
                        "{:<6} {:>12} {:>12} {:<10} {:<10} {:<10}",
                        v.reference_name.to_string(),
                        v.start,
                        v.effective_end(),
                        truncate(&v.reference_bases, 10),
                        truncate(v.alternate_bases.as_deref().unwrap_or("-"), 10),
                        v.effective_type().map_or("-", |t| t.as_str()),
                    );
                }

                if !all && variants.len() > SHOWN_VARIANTS {
                    println!(
                        "\n... and {} more variants (use --all to show all)",
                        variants.len() - SHOWN_VARIANTS
                    );
                }
            }
        }
        OutputFormat::Json => {
            if show_variants {
                let json = serde_json::json!({
                    "dataset": dataset,
                    "variants": variants,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&dataset)?);
            }
        }
        OutputFormat::Tsv => {
            println!("reference_name\tstart\tend\treference_bases\talternate_bases\tvariant_type\tfrequency");
            for v in &variants {
                print_variant_tsv(v);
            }
        }
    }

    Ok(())
}

fn print_variant_tsv(v: &VariantRecord) {
    println!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        v.reference_name,
        v.start,
        v.effective_end(),
        v.reference_bases,
        v.alternate_bases.as_deref().unwrap_or(""),
        v.effective_type().map_or("", |t| t.as_str()),
        v.frequency.map(|f| f.to_string()).unwrap_or_default(),
    );
}

fn run_export(output: PathBuf, catalog_path: Option<PathBuf>) -> anyhow::Result<()> {
    let catalog = load_catalog(catalog_path)?;

    let json = catalog.to_json()?;
    std::fs::write(&output, json)?;

    println!(
        "Exported {} datasets to {}",
        catalog.len(),
        output.display()
    );

    Ok(())
}

struct ImportOptions {
    input: PathBuf,
    dataset: String,
    assembly: String,
    name: Option<String>,
    description: Option<String>,
    access: AccessLevel,
    catalog: Option<PathBuf>,
    output: PathBuf,
}

fn run_import(opts: ImportOptions, verbose: bool) -> anyhow::Result<()> {
    if let Some(problem) = check_token(&opts.dataset) {
        anyhow::bail!("Invalid dataset id '{}': {}", opts.dataset, problem);
    }
    if !is_valid_assembly(&opts.assembly) {
        anyhow::bail!(
            "Invalid assembly '{}': expected e.g. GRCh38 or hg19",
            opts.assembly
        );
    }

    let mut catalog = match &opts.catalog {
        Some(path) => CatalogStore::load_from_file(path)?,
        None => CatalogStore::new(),
    };

    let import = parse_vcf_file(&opts.input, &opts.assembly)?;
    let imported = import.records.len();

    if verbose {
        eprintln!(
            "Read {} variants from {} ({} skipped, {} sample columns)",
            imported,
            opts.input.display(),
            import.skipped,
            import.sample_columns
        );
    }

    let id = DatasetId::new(&opts.dataset);
    if catalog.get(&id).is_some() {
        catalog.add_variants(&id, import.records)?;
    } else {
        let mut dataset = Dataset::new(&opts.dataset, &opts.assembly, opts.access);
        dataset.name = opts.name;
        dataset.description = opts.description;
        dataset.sample_count = import.sample_columns;
        catalog.add_dataset(dataset, import.records)?;
    }

    std::fs::write(&opts.output, catalog.to_json()?)?;

    println!(
        "Imported {} variants into {} ({} skipped); catalog written to {}",
        imported,
        id,
        import.skipped,
        opts.output.display()
    );

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

//! Import of VCF data lines as catalog variant records.
//!
//! Each ALT allele of a data line becomes one [`VariantRecord`]. Positions are
//! converted from the 1-based VCF `POS` to 0-based starts; an `INFO/END` value
//! (1-based, inclusive) is already the 0-based exclusive end.
//!
//! | INFO key | Maps to |
//! |----------|---------|
//! | END      | `end` |
//! | SVTYPE   | `variant_type` |
//! | AF       | `frequency` (per ALT allele) |
//! | AN       | `call_count` |
//! | NS       | `sample_count` |
//!
//! Plain text and gzip/bgzip input are both accepted.

use flate2::read::MultiGzDecoder;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::dataset::VariantRecord;
use crate::core::types::{Chromosome, VariantType};
use crate::utils::validation::{check_variant_limit, is_valid_bases};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid VCF format at line {line}: {message}")]
    InvalidFormat { line: usize, message: String },

    #[error("Too many variants (limit exceeded at {0})")]
    TooManyVariants(usize),
}

/// Records read from one VCF plus what was left out
#[derive(Debug, Default)]
pub struct VcfImport {
    pub records: Vec<VariantRecord>,
    /// Number of sample columns declared in the `#CHROM` header
    pub sample_columns: u64,
    /// Alleles skipped for an unsupported chromosome, missing ALT or bad bases
    pub skipped: usize,
}

impl VcfImport {
    /// INFO keys seen on imported records, usable as filter labels
    #[must_use]
    pub fn attribute_labels(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .flat_map(|r| r.attributes.keys().cloned())
            .collect()
    }
}

/// Parse a VCF file, decompressing it when it is gzip or bgzip encoded
pub fn parse_vcf_file(path: &Path, assembly_id: &str) -> Result<VcfImport, ParseError> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let gzipped = file.read(&mut magic)? == 2 && magic == [0x1f, 0x8b];
    let file = File::open(path)?;

    let reader: Box<dyn Read> = if gzipped {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    parse_vcf_reader(BufReader::new(reader), assembly_id)
}

/// Parse VCF text held in memory
pub fn parse_vcf_text(text: &str, assembly_id: &str) -> Result<VcfImport, ParseError> {
    parse_vcf_reader(text.as_bytes(), assembly_id)
}

/// Parse VCF lines from any buffered reader
pub fn parse_vcf_reader<R: BufRead>(reader: R, assembly_id: &str) -> Result<VcfImport, ParseError> {
    let mut import = VcfImport::default();
    let mut unsupported: HashSet<String> = HashSet::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;

        if let Some(header) = line.strip_prefix("#CHROM") {
            import.sample_columns = header.split('\t').count().saturating_sub(9) as u64;
            continue;
        }
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 8 {
            return Err(ParseError::InvalidFormat {
                line: line_no,
                message: format!("expected at least 8 tab-separated columns, found {}", fields.len()),
            });
        }

        let Some(chromosome) = Chromosome::parse_lenient(fields[0]) else {
            if unsupported.insert(fields[0].to_string()) {
                warn!(chromosome = fields[0], "Skipping variants on unsupported chromosome");
            }
            import.skipped += 1;
            continue;
        };

        let pos: u64 = fields[1].parse().map_err(|_| ParseError::InvalidFormat {
            line: line_no,
            message: format!("POS '{}' is not a positive integer", fields[1]),
        })?;
        if pos == 0 {
            return Err(ParseError::InvalidFormat {
                line: line_no,
                message: "POS must be at least 1".to_string(),
            });
        }

        let reference = fields[3].to_ascii_uppercase();
        if !is_valid_bases(&reference) {
            debug!(line = line_no, reference = %reference, "Skipping record with unsupported REF");
            import.skipped += 1;
            continue;
        }

        let variant_id = Some(fields[2].trim())
            .filter(|id| !id.is_empty() && *id != ".")
            .map(str::to_string);
        let info = Info::parse(fields[7]);
        for (allele_idx, alt) in fields[4].split(',').enumerate() {
            let Some(allele) = classify_alt(alt) else {
                import.skipped += 1;
                continue;
            };

            if check_variant_limit(import.records.len()).is_some() {
                return Err(ParseError::TooManyVariants(import.records.len()));
            }

            let mut record = VariantRecord::new(chromosome, assembly_id, pos - 1, reference.clone());
            record.variant_id = variant_id.clone();
            match allele {
                Allele::Bases(bases) => record.alternate_bases = Some(bases),
                Allele::Symbolic(variant_type) => record.variant_type = variant_type,
            }
            if let Some(sv_type) = info.sv_type {
                record.variant_type = Some(sv_type);
            }
            record.end = info.end.filter(|&end| end > pos - 1);
            record.frequency = info.frequencies.get(allele_idx).copied().flatten();
            record.call_count = info.allele_number;
            record.sample_count = info.sample_number;
            record.attributes = info.flags.clone();

            import.records.push(record);
        }
    }

    debug!(
        records = import.records.len(),
        skipped = import.skipped,
        "Parsed VCF"
    );
    Ok(import)
}

enum Allele {
    Bases(String),
    Symbolic(Option<VariantType>),
}

/// Classify one ALT allele; `None` for alleles that carry no variant (`.`, `*`, `<NON_REF>`)
fn classify_alt(alt: &str) -> Option<Allele> {
    let alt = alt.trim();
    if alt.is_empty() || alt == "." || alt == "*" {
        return None;
    }
    if alt.contains('[') || alt.contains(']') {
        return Some(Allele::Symbolic(Some(VariantType::Bnd)));
    }
    if let Some(symbol) = alt.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        if symbol == "NON_REF" || symbol == "*" {
            return None;
        }
        return Some(Allele::Symbolic(symbolic_type(symbol)));
    }
    let bases = alt.to_ascii_uppercase();
    is_valid_bases(&bases).then_some(Allele::Bases(bases))
}

/// Most specific known type for a symbolic allele such as `INS:ME:ALU`
fn symbolic_type(symbol: &str) -> Option<VariantType> {
    let parts: Vec<&str> = symbol.split(':').collect();
    (1..=parts.len())
        .rev()
        .find_map(|n| parts[..n].join(":").parse().ok())
}

/// The INFO values that map onto record fields
#[derive(Debug, Default)]
struct Info {
    end: Option<u64>,
    sv_type: Option<VariantType>,
    frequencies: Vec<Option<f64>>,
    allele_number: Option<u64>,
    sample_number: Option<u64>,
    /// Remaining simple key=value pairs, kept as filterable attributes
    flags: BTreeMap<String, serde_json::Value>,
}

impl Info {
    fn parse(column: &str) -> Self {
        let mut info = Self::default();
        if column == "." {
            return info;
        }
        for entry in column.split(';') {
            let (key, value) = entry.split_once('=').unwrap_or((entry, ""));
            match key {
                "END" => info.end = value.parse().ok(),
                "SVTYPE" => info.sv_type = symbolic_type(value),
                "AF" => info.frequencies = value.split(',').map(|v| v.parse().ok()).collect(),
                "AN" => info.allele_number = value.parse().ok(),
                "NS" => info.sample_number = value.parse().ok(),
                "" => {}
                _ if value.is_empty() => {
                    info.flags.insert(key.to_string(), serde_json::Value::Bool(true));
                }
                _ if !value.contains(',') => {
                    let parsed = value
                        .parse::<i64>()
                        .map(serde_json::Value::from)
                        .or_else(|_| value.parse::<f64>().map(serde_json::Value::from))
                        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
                    info.flags.insert(key.to_string(), parsed);
                }
                _ => {}
            }
        }
        info
    }
}

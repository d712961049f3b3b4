use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Stable identifier of a dataset in the catalog
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(pub String);

impl DatasetId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference sequence a variant is placed on.
///
/// Beacon queries use NCBI-style names only: `1`..`22`, `X`, `Y`, `MT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Chromosome {
    Autosome(u8),
    X,
    Y,
    Mt,
}

impl Chromosome {
    /// Parse a name as it may appear in a VCF or catalog, tolerating a `chr`
    /// prefix and the UCSC `M` spelling of the mitochondrial sequence.
    #[must_use]
    pub fn parse_lenient(name: &str) -> Option<Self> {
        let trimmed = name
            .strip_prefix("chr")
            .or_else(|| name.strip_prefix("CHR"))
            .unwrap_or(name);
        match trimmed {
            "M" | "m" => Some(Self::Mt),
            other => other.parse().ok(),
        }
    }
}

impl FromStr for Chromosome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            "MT" => Ok(Self::Mt),
            n if !n.is_empty() && n.len() <= 2 && n.bytes().all(|b| b.is_ascii_digit()) => {
                match n.parse::<u8>() {
                    Ok(v) if (1..=22).contains(&v) && !n.starts_with('0') => Ok(Self::Autosome(v)),
                    _ => Err(format!("'{s}' is not a valid reference name")),
                }
            }
            _ => Err(format!("'{s}' is not a valid reference name")),
        }
    }
}

impl std::fmt::Display for Chromosome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Autosome(n) => write!(f, "{n}"),
            Self::X => write!(f, "X"),
            Self::Y => write!(f, "Y"),
            Self::Mt => write!(f, "MT"),
        }
    }
}

impl TryFrom<String> for Chromosome {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Chromosome> for String {
    fn from(value: Chromosome) -> Self {
        value.to_string()
    }
}

/// Structural or small-variant class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantType {
    #[serde(rename = "DEL")]
    Del,
    #[serde(rename = "INS")]
    Ins,
    #[serde(rename = "DUP")]
    Dup,
    #[serde(rename = "INV")]
    Inv,
    #[serde(rename = "CNV")]
    Cnv,
    #[serde(rename = "SNP")]
    Snp,
    #[serde(rename = "MNP")]
    Mnp,
    #[serde(rename = "DUP:TANDEM")]
    DupTandem,
    #[serde(rename = "DEL:ME")]
    DelMe,
    #[serde(rename = "INS:ME")]
    InsMe,
    #[serde(rename = "BND")]
    Bnd,
}

impl VariantType {
    pub const ALL: [VariantType; 11] = [
        Self::Del,
        Self::Ins,
        Self::Dup,
        Self::Inv,
        Self::Cnv,
        Self::Snp,
        Self::Mnp,
        Self::DupTandem,
        Self::DelMe,
        Self::InsMe,
        Self::Bnd,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Del => "DEL",
            Self::Ins => "INS",
            Self::Dup => "DUP",
            Self::Inv => "INV",
            Self::Cnv => "CNV",
            Self::Snp => "SNP",
            Self::Mnp => "MNP",
            Self::DupTandem => "DUP:TANDEM",
            Self::DelMe => "DEL:ME",
            Self::InsMe => "INS:ME",
            Self::Bnd => "BND",
        }
    }

    /// Whether a record of type `other` belongs to the class named by `self`.
    ///
    /// `CNV` covers copy-number changes in either direction, and the generic
    /// `DEL`/`DUP`/`INS` classes cover their refined subtypes.
    #[must_use]
    pub fn covers(self, other: VariantType) -> bool {
        match self {
            Self::Cnv => matches!(
                other,
                Self::Cnv | Self::Del | Self::Dup | Self::DelMe | Self::DupTandem
            ),
            Self::Del => matches!(other, Self::Del | Self::DelMe),
            Self::Dup => matches!(other, Self::Dup | Self::DupTandem),
            Self::Ins => matches!(other, Self::Ins | Self::InsMe),
            _ => self == other,
        }
    }
}

impl FromStr for VariantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("'{s}' is not a valid variant type"))
    }
}

impl std::fmt::Display for VariantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which per-dataset results a response itemizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncludeDatasetResponses {
    All,
    Hit,
    Miss,
    #[default]
    None,
}

impl IncludeDatasetResponses {
    /// Whether a dataset result with the given outcome is itemized
    #[must_use]
    pub fn includes(self, exists: bool) -> bool {
        match self {
            Self::All => true,
            Self::Hit => exists,
            Self::Miss => !exists,
            Self::None => false,
        }
    }
}

impl FromStr for IncludeDatasetResponses {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALL" => Ok(Self::All),
            "HIT" => Ok(Self::Hit),
            "MISS" => Ok(Self::Miss),
            "NONE" => Ok(Self::None),
            _ => Err(format!("'{s}' is not one of ALL, HIT, MISS, NONE")),
        }
    }
}

impl std::fmt::Display for IncludeDatasetResponses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "ALL"),
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::None => write!(f, "NONE"),
        }
    }
}

/// Access tier of a dataset, ordered from least to most restricted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessLevel {
    Public,
    Registered,
    Controlled,
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(Self::Public),
            "REGISTERED" => Ok(Self::Registered),
            "CONTROLLED" => Ok(Self::Controlled),
            _ => Err(format!("'{s}' is not one of PUBLIC, REGISTERED, CONTROLLED")),
        }
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "PUBLIC"),
            Self::Registered => write!(f, "REGISTERED"),
            Self::Controlled => write!(f, "CONTROLLED"),
        }
    }
}

//! Service metadata and runtime query limits.
//!
//! [`BeaconInfo`] is loaded once at startup (embedded default or a JSON file)
//! and shared read-only. [`QueryConfig`] carries the limits the query service
//! enforces per request.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Version of the Beacon API this service speaks
pub const API_VERSION: &str = "1.0.0";

pub const DEFAULT_PORT: u16 = 5050;
pub const DEFAULT_MAX_CONCURRENCY: usize = 20;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

/// Static description of this beacon and the organization running it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconInfo {
    /// Reverse-domain identifier, e.g. `org.example.beacon`
    pub id: String,
    pub name: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_service_type")]
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    #[serde(default)]
    pub entry_point: bool,
    pub organization: Organization,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    #[serde(default)]
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_date_time: Option<String>,
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Example requests advertised on the info endpoint
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_allele_requests: Vec<serde_json::Value>,
    /// Links returned with genomic query answers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub beacon_handover: Vec<Handover>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverType {
    pub id: String,
    pub label: String,
}

/// Pointer to where more can be found out about an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handover {
    pub handover_type: HandoverType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub url: String,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_service_type() -> String {
    "GA4GHBeacon".to_string()
}

fn default_environment() -> String {
    "prod".to_string()
}

/// GA4GH service-info rendering of [`BeaconInfo`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub organization: ServiceOrganization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_date_time: Option<String>,
    pub environment: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceOrganization {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Row of the `/services` listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEntry {
    pub id: String,
    pub name: String,
    pub service_type: String,
    pub api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    pub entry_point: bool,
    pub organization: Organization,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
    pub open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub welcome_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_date_time: Option<String>,
}

/// `listFormat=short` row of the `/services` listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    pub service_type: String,
    pub open: bool,
}

impl BeaconInfo {
    /// Load the metadata embedded in the binary
    pub fn load_embedded() -> Result<Self, ConfigError> {
        // Checked at compile time by build.rs
        const EMBEDDED_INFO: &str = include_str!("../config/beacon_info.json");
        Self::from_json(EMBEDDED_INFO)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let info: Self = serde_json::from_str(json)?;
        if info.id.trim().is_empty() {
            return Err(ConfigError::Invalid("beacon id must not be empty".to_string()));
        }
        if info.api_version != API_VERSION {
            tracing::warn!(
                expected = API_VERSION,
                found = %info.api_version,
                "Beacon info declares a different API version"
            );
        }
        Ok(info)
    }

    /// Configured handovers, or a link to the organization contact
    #[must_use]
    pub fn beacon_handover(&self) -> Vec<Handover> {
        if !self.beacon_handover.is_empty() {
            return self.beacon_handover.clone();
        }
        self.organization
            .contact_url
            .iter()
            .map(|url| Handover {
                handover_type: HandoverType {
                    id: "CUSTOM".to_string(),
                    label: "Organization contact".to_string(),
                },
                note: Some("Organization contact details maintaining this Beacon".to_string()),
                url: url.clone(),
            })
            .collect()
    }

    #[must_use]
    pub fn service_entry(&self) -> ServiceEntry {
        ServiceEntry {
            id: self.id.clone(),
            name: self.name.clone(),
            service_type: self.service_type.clone(),
            api_version: self.api_version.clone(),
            service_url: self.service_url.clone(),
            entry_point: self.entry_point,
            organization: self.organization.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            open: self.open,
            welcome_url: self.welcome_url.clone(),
            alternative_url: self.alternative_url.clone(),
            create_date_time: self.create_date_time.clone(),
            update_date_time: self.update_date_time.clone(),
        }
    }

    #[must_use]
    pub fn service_summary(&self) -> ServiceSummary {
        ServiceSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            service_url: self.service_url.clone(),
            service_type: self.service_type.clone(),
            open: self.open,
        }
    }

    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            service_type: format!("org.ga4gh:beacon:{}", self.api_version),
            description: self.description.clone(),
            organization: ServiceOrganization {
                name: self.organization.name.clone(),
                url: self.organization.welcome_url.clone(),
            },
            contact_url: self.organization.contact_url.clone(),
            documentation_url: self.documentation_url.clone(),
            create_date_time: self.create_date_time.clone(),
            update_date_time: self.update_date_time.clone(),
            environment: self.environment.clone(),
            version: self.version.clone(),
        }
    }
}

/// Per-request limits enforced by the query service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    /// Storage reads allowed in flight at once, across all requests
    pub max_concurrency: usize,
    /// Deadline covering dataset listing and every match of one request
    pub query_timeout: Duration,
    /// Pause before the single retry of a transient storage fault
    pub retry_backoff: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

impl QueryConfig {
    /// Check the limits are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max concurrency must be at least 1".to_string(),
            ));
        }
        if self.query_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "query timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

use std::time::Duration;
use thiserror::Error;

use crate::core::types::DatasetId;

/// A query field that violated a constraint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid field '{field}': {constraint}")]
pub struct SchemaValidationError {
    pub field: String,
    pub constraint: String,
}

impl SchemaValidationError {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}

/// Failures raised by a [`crate::catalog::store::VariantStore`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Transient; the matcher retries once
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage query failed: {0}")]
    Query(String),

    #[error("catalog error: {0}")]
    Catalog(String),
}

impl StorageError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Every way a query can fail as seen by callers
#[derive(Error, Debug)]
pub enum BeaconError {
    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),

    /// `authenticated` distinguishes missing credentials from insufficient ones
    #[error("{}", unauthorized_message(.authenticated))]
    Unauthorized { authenticated: bool },

    #[error("dataset not found: {0}")]
    NotFound(DatasetId),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("query did not complete within {0:?}")]
    Timeout(Duration),

    /// A bug surfaced while answering, e.g. a panicked match task
    #[error("internal error: {0}")]
    Internal(String),
}

fn unauthorized_message(authenticated: &bool) -> &'static str {
    if *authenticated {
        "access to the requested datasets is forbidden"
    } else {
        "authentication is required for the requested datasets"
    }
}

impl From<StorageError> for BeaconError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl BeaconError {
    /// Stable error type name used in API error bodies
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::SchemaValidation(_) => "SchemaValidation",
            Self::Unauthorized {
                authenticated: false,
            } => "Unauthorized",
            Self::Unauthorized {
                authenticated: true,
            } => "Forbidden",
            Self::NotFound(_) => "NotFound",
            Self::Storage(_) => "Storage",
            Self::Timeout(_) => "Timeout",
            Self::Internal(_) => "Internal",
        }
    }
}

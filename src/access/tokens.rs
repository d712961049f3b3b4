//! Bearer token registry.
//!
//! Tokens are read from a JSON file:
//!
//! ```json
//! {"tokens": [{"token": "abc", "bona_fide": true, "permissions": ["EGAD00001000743"]}]}
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::access::AuthContext;
use crate::config::ConfigError;
use crate::core::types::DatasetId;
use crate::error::BeaconError;

#[derive(Debug, Clone, Deserialize)]
struct TokenEntry {
    token: String,
    #[serde(default)]
    bona_fide: bool,
    #[serde(default)]
    permissions: Vec<DatasetId>,
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    tokens: Vec<TokenEntry>,
}

/// Known bearer tokens and the access each one grants
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    grants: HashMap<String, AuthContext>,
}

impl TokenRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: TokenFile = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for entry in file.tokens {
            if entry.token.trim().is_empty() {
                return Err(ConfigError::Invalid("token must not be empty".to_string()));
            }
            registry.insert(entry.token, entry.bona_fide, entry.permissions);
        }
        Ok(registry)
    }

    pub fn insert(
        &mut self,
        token: impl Into<String>,
        bona_fide: bool,
        permissions: impl IntoIterator<Item = DatasetId>,
    ) {
        let mut context = AuthContext::authenticated(permissions);
        context.bona_fide = bona_fide;
        self.grants.insert(token.into(), context);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Resolve an `Authorization` header value.
    ///
    /// No header yields an anonymous context.
    ///
    /// # Errors
    ///
    /// Returns `BeaconError::Unauthorized` for a header that is not a bearer
    /// token, or for a token this registry does not know.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<AuthContext, BeaconError> {
        let Some(header) = authorization else {
            return Ok(AuthContext::anonymous());
        };

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(BeaconError::Unauthorized {
                authenticated: false,
            })?;

        self.grants
            .get(token)
            .cloned()
            .ok_or(BeaconError::Unauthorized {
                authenticated: false,
            })
    }
}

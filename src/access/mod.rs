//! Who is asking, and which datasets they may see.
//!
//! - [`tokens`]: bearer tokens to [`AuthContext`]
//! - [`resolver`]: the permitted dataset set for one query
//! - [`levels`]: per-field access levels applied to results

pub mod levels;
pub mod resolver;
pub mod tokens;

use std::collections::BTreeSet;

use crate::core::types::{AccessLevel, DatasetId};

/// Identity of the requester as far as dataset visibility is concerned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub authenticated: bool,
    /// Registered researcher status; recorded for auditing, visibility only needs `authenticated`
    pub bona_fide: bool,
    /// Controlled datasets this requester has been granted
    pub permissions: BTreeSet<DatasetId>,
}

impl AuthContext {
    /// An unauthenticated requester; sees only PUBLIC datasets
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn authenticated(permissions: impl IntoIterator<Item = DatasetId>) -> Self {
        Self {
            authenticated: true,
            bona_fide: false,
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Whether a dataset with the given id and access level is visible
    #[must_use]
    pub fn can_see(&self, id: &DatasetId, level: AccessLevel) -> bool {
        match level {
            AccessLevel::Public => true,
            AccessLevel::Registered => self.authenticated,
            AccessLevel::Controlled => self.authenticated && self.permissions.contains(id),
        }
    }
}

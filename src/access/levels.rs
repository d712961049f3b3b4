//! Per-field access levels for response content.
//!
//! A dataset's access tier decides whether a caller sees the dataset at all.
//! Field levels go further: a field whose level the caller does not hold for
//! that dataset is left out of the dataset's results, even though the
//! dataset itself is visible.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::access::AuthContext;
use crate::config::ConfigError;
use crate::core::response::{BeaconResponse, DatasetMatchResult};
use crate::core::types::{AccessLevel, DatasetId};

/// Field group holding the per-dataset counts
pub const DATASET_RESPONSE_GROUP: &str = "datasetAlleleResponses";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldLevel {
    pub access_level: AccessLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Levels for the fields of one response object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldGroup {
    pub access_level_summary: AccessLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldLevel>,
}

/// Overrides for one dataset: group name to field name to level
pub type DatasetOverrides = BTreeMap<String, BTreeMap<String, AccessLevel>>;

/// Access levels of response fields, with per-dataset overrides.
///
/// Fields that are not listed are public.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLevels {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldGroup>,
    #[serde(default)]
    pub datasets: BTreeMap<DatasetId, DatasetOverrides>,
}

impl AccessLevels {
    /// Load the levels embedded in the binary
    pub fn load_embedded() -> Result<Self, ConfigError> {
        // Checked at compile time by build.rs
        const EMBEDDED_LEVELS: &str = include_str!("../../config/access_levels.json");
        Self::from_json(EMBEDDED_LEVELS)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Group name to its summary level
    #[must_use]
    pub fn summary(&self) -> BTreeMap<String, AccessLevel> {
        self.fields
            .iter()
            .map(|(group, details)| (group.clone(), details.access_level_summary))
            .collect()
    }

    /// Level of `group.field` for one dataset
    #[must_use]
    pub fn level_of(&self, dataset: &DatasetId, group: &str, field: &str) -> AccessLevel {
        let overridden = self
            .datasets
            .get(dataset)
            .and_then(|groups| groups.get(group))
            .and_then(|fields| fields.get(field));
        if let Some(level) = overridden {
            return *level;
        }
        self.fields.get(group).map_or(AccessLevel::Public, |g| {
            g.fields
                .get(field)
                .map_or(g.access_level_summary, |f| f.access_level)
        })
    }

    /// Drop the optional counts of `result` the caller may not read
    pub fn redact(&self, result: &mut DatasetMatchResult, auth: &AuthContext) {
        let id = result.dataset_id.clone();
        let allowed =
            |field: &str| auth.can_see(&id, self.level_of(&id, DATASET_RESPONSE_GROUP, field));

        if !allowed("frequency") {
            result.frequency = None;
        }
        if !allowed("sampleCount") {
            result.sample_count = None;
        }
        if !allowed("callCount") {
            result.call_count = None;
        }
    }

    /// Apply [`Self::redact`] to every dataset result in a response
    pub fn redact_response(&self, response: &mut BeaconResponse, auth: &AuthContext) {
        let per_variant = response
            .variants_found
            .iter_mut()
            .flat_map(|v| v.dataset_allele_responses.iter_mut());
        for result in response.dataset_allele_responses.iter_mut().chain(per_variant) {
            self.redact(result, auth);
        }
    }

    /// Overrides for the given datasets only
    #[must_use]
    pub fn overrides_for<'a>(
        &self,
        datasets: impl IntoIterator<Item = &'a DatasetId>,
    ) -> BTreeMap<DatasetId, DatasetOverrides> {
        datasets
            .into_iter()
            .filter_map(|id| self.datasets.get(id).map(|o| (id.clone(), o.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> AccessLevels {
        AccessLevels::from_json(
            r#"{
                "fields": {
                    "datasetAlleleResponses": {
                        "accessLevelSummary": "PUBLIC",
                        "fields": {
                            "frequency": {"accessLevel": "REGISTERED"},
                            "sampleCount": {"accessLevel": "PUBLIC"}
                        }
                    }
                },
                "datasets": {
                    "D2": {"datasetAlleleResponses": {"sampleCount": "CONTROLLED"}}
                }
            }"#,
        )
        .unwrap()
    }

    fn hit(id: &str) -> DatasetMatchResult {
        DatasetMatchResult {
            frequency: Some(0.5),
            sample_count: Some(3),
            call_count: Some(10),
            exists: true,
            variant_count: 1,
            ..DatasetMatchResult::miss(DatasetId::new(id), AccessLevel::Public)
        }
    }

    #[test]
    fn test_embedded_levels_load() {
        let levels = AccessLevels::load_embedded().unwrap();
        assert_eq!(
            levels.summary().get(DATASET_RESPONSE_GROUP),
            Some(&AccessLevel::Public)
        );
        assert!(levels.fields[DATASET_RESPONSE_GROUP].fields.contains_key("frequency"));
    }

    #[test]
    fn test_level_lookup_order() {
        let levels = levels();
        let d1 = DatasetId::new("D1");
        let d2 = DatasetId::new("D2");
        assert_eq!(levels.level_of(&d1, DATASET_RESPONSE_GROUP, "frequency"), AccessLevel::Registered);
        assert_eq!(levels.level_of(&d1, DATASET_RESPONSE_GROUP, "sampleCount"), AccessLevel::Public);
        assert_eq!(levels.level_of(&d2, DATASET_RESPONSE_GROUP, "sampleCount"), AccessLevel::Controlled);
        // Unlisted field falls back to the group summary, unlisted group is public
        assert_eq!(levels.level_of(&d1, DATASET_RESPONSE_GROUP, "callCount"), AccessLevel::Public);
        assert_eq!(levels.level_of(&d1, "other", "x"), AccessLevel::Public);
    }

    #[test]
    fn test_redact_by_caller() {
        let levels = levels();

        let mut anonymous = hit("D1");
        levels.redact(&mut anonymous, &AuthContext::anonymous());
        assert_eq!(anonymous.frequency, None);
        assert_eq!(anonymous.sample_count, Some(3));
        assert_eq!(anonymous.call_count, Some(10));

        let mut registered = hit("D1");
        levels.redact(&mut registered, &AuthContext::authenticated([]));
        assert_eq!(registered.frequency, Some(0.5));

        let mut controlled = hit("D2");
        levels.redact(&mut controlled, &AuthContext::authenticated([]));
        assert_eq!(controlled.sample_count, None);

        let mut granted = hit("D2");
        levels.redact(&mut granted, &AuthContext::authenticated([DatasetId::new("D2")]));
        assert_eq!(granted.sample_count, Some(3));
    }

    #[test]
    fn test_default_levels_redact_nothing() {
        let mut result = hit("D1");
        AccessLevels::default().redact(&mut result, &AuthContext::anonymous());
        assert_eq!(result, hit("D1"));
    }

    #[test]
    fn test_overrides_for_visible_only() {
        let levels = levels();
        let visible = [DatasetId::new("D1")];
        assert!(levels.overrides_for(&visible).is_empty());
        let visible = [DatasetId::new("D2")];
        assert_eq!(levels.overrides_for(&visible).len(), 1);
    }
}

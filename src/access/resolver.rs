use std::collections::BTreeSet;
use tracing::debug;

use crate::access::AuthContext;
use crate::core::dataset::Dataset;
use crate::core::response::{InaccessibleDataset, NoticeReason};
use crate::core::types::{DatasetId, IncludeDatasetResponses};
use crate::error::BeaconError;

/// Datasets a query will be evaluated against
#[derive(Debug, Clone, PartialEq)]
pub struct AccessResolution {
    /// Sorted by dataset id
    pub permitted: Vec<Dataset>,
    /// Requested ids that were left out, sorted by dataset id
    pub not_accessible: Vec<InaccessibleDataset>,
    /// Whether per-dataset results may be returned, or only `exists`
    pub itemization_allowed: bool,
}

/// Decide which datasets of `catalog` a query may touch.
///
/// An empty `requested` list means every visible dataset. Otherwise the
/// requested ids are intersected with the visible set and each one left out
/// becomes a notice.
///
/// # Errors
///
/// Returns `BeaconError::Unauthorized` when nothing is permitted and at least
/// one existing dataset was withheld because of its access level. An empty
/// catalog, or a request naming only unknown ids, is not an error.
pub fn resolve_datasets(
    auth: &AuthContext,
    requested: &[DatasetId],
    catalog: &[Dataset],
    include: IncludeDatasetResponses,
) -> Result<AccessResolution, BeaconError> {
    let mut permitted = Vec::new();
    let mut not_accessible = Vec::new();
    let mut withheld = false;

    if requested.is_empty() {
        for dataset in catalog {
            if auth.can_see(&dataset.id, dataset.access_level) {
                permitted.push(dataset.clone());
            } else {
                withheld = true;
            }
        }
    } else {
        let wanted: BTreeSet<&DatasetId> = requested.iter().collect();
        for id in wanted {
            match catalog.iter().find(|d| &d.id == id) {
                None => not_accessible.push(InaccessibleDataset {
                    dataset_id: id.clone(),
                    reason: NoticeReason::NotFound,
                }),
                Some(dataset) if auth.can_see(&dataset.id, dataset.access_level) => {
                    permitted.push(dataset.clone());
                }
                Some(_) => {
                    withheld = true;
                    not_accessible.push(InaccessibleDataset {
                        dataset_id: id.clone(),
                        reason: NoticeReason::AccessDenied,
                    });
                }
            }
        }
    }

    if permitted.is_empty() && withheld {
        return Err(BeaconError::Unauthorized {
            authenticated: auth.authenticated,
        });
    }

    permitted.sort_by(|a, b| a.id.cmp(&b.id));
    not_accessible.sort();

    debug!(
        permitted = permitted.len(),
        not_accessible = not_accessible.len(),
        "Resolved datasets"
    );

    Ok(AccessResolution {
        permitted,
        not_accessible,
        itemization_allowed: include != IncludeDatasetResponses::None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AccessLevel;

    fn catalog() -> Vec<Dataset> {
        vec![
            Dataset::new("PUB2", "GRCh38", AccessLevel::Public),
            Dataset::new("PUB1", "GRCh38", AccessLevel::Public),
            Dataset::new("REG", "GRCh38", AccessLevel::Registered),
            Dataset::new("CTRL", "GRCh38", AccessLevel::Controlled),
        ]
    }

    fn ids(resolution: &AccessResolution) -> Vec<&str> {
        resolution.permitted.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_empty_request_means_all_visible() {
        let resolution = resolve_datasets(
            &AuthContext::anonymous(),
            &[],
            &catalog(),
            IncludeDatasetResponses::None,
        )
        .unwrap();
        assert_eq!(ids(&resolution), vec!["PUB1", "PUB2"]);
        assert!(resolution.not_accessible.is_empty());
        assert!(!resolution.itemization_allowed);
    }

    #[test]
    fn test_authenticated_visibility() {
        let auth = AuthContext::authenticated([DatasetId::new("CTRL")]);
        let resolution =
            resolve_datasets(&auth, &[], &catalog(), IncludeDatasetResponses::All).unwrap();
        assert_eq!(ids(&resolution), vec!["CTRL", "PUB1", "PUB2", "REG"]);
        assert!(resolution.itemization_allowed);

        let registered_only = AuthContext::authenticated([]);
        let resolution = resolve_datasets(
            &registered_only,
            &[],
            &catalog(),
            IncludeDatasetResponses::Hit,
        )
        .unwrap();
        assert_eq!(ids(&resolution), vec!["PUB1", "PUB2", "REG"]);
    }

    #[test]
    fn test_requested_with_unknown_id() {
        let requested = [DatasetId::new("MISSING"), DatasetId::new("PUB1")];
        let resolution = resolve_datasets(
            &AuthContext::anonymous(),
            &requested,
            &catalog(),
            IncludeDatasetResponses::All,
        )
        .unwrap();
        assert_eq!(ids(&resolution), vec!["PUB1"]);
        assert_eq!(
            resolution.not_accessible,
            vec![InaccessibleDataset {
                dataset_id: DatasetId::new("MISSING"),
                reason: NoticeReason::NotFound,
            }]
        );
    }

    #[test]
    fn test_requested_hidden_dataset_is_notice_when_others_permitted() {
        let requested = [DatasetId::new("CTRL"), DatasetId::new("PUB2")];
        let resolution = resolve_datasets(
            &AuthContext::anonymous(),
            &requested,
            &catalog(),
            IncludeDatasetResponses::None,
        )
        .unwrap();
        assert_eq!(ids(&resolution), vec!["PUB2"]);
        assert_eq!(resolution.not_accessible[0].reason, NoticeReason::AccessDenied);
    }

    #[test]
    fn test_unauthorized_when_only_hidden_requested() {
        let requested = [DatasetId::new("CTRL")];
        let err = resolve_datasets(
            &AuthContext::anonymous(),
            &requested,
            &catalog(),
            IncludeDatasetResponses::None,
        )
        .unwrap_err();
        assert!(matches!(err, BeaconError::Unauthorized { authenticated: false }));

        let err = resolve_datasets(
            &AuthContext::authenticated([]),
            &requested,
            &catalog(),
            IncludeDatasetResponses::None,
        )
        .unwrap_err();
        assert!(matches!(err, BeaconError::Unauthorized { authenticated: true }));
    }

    #[test]
    fn test_unauthorized_when_catalog_is_all_hidden() {
        let hidden = vec![Dataset::new("CTRL", "GRCh38", AccessLevel::Controlled)];
        let err = resolve_datasets(
            &AuthContext::anonymous(),
            &[],
            &hidden,
            IncludeDatasetResponses::None,
        )
        .unwrap_err();
        assert!(matches!(err, BeaconError::Unauthorized { .. }));
    }

    #[test]
    fn test_empty_catalog_is_not_an_error() {
        let resolution = resolve_datasets(
            &AuthContext::anonymous(),
            &[],
            &[],
            IncludeDatasetResponses::All,
        )
        .unwrap();
        assert!(resolution.permitted.is_empty());

        let requested = [DatasetId::new("NOPE")];
        let resolution = resolve_datasets(
            &AuthContext::anonymous(),
            &requested,
            &[],
            IncludeDatasetResponses::All,
        )
        .unwrap();
        assert!(resolution.permitted.is_empty());
        assert_eq!(resolution.not_accessible.len(), 1);
    }

    #[test]
    fn test_duplicate_requests_collapse() {
        let requested = [DatasetId::new("PUB1"), DatasetId::new("PUB1")];
        let resolution = resolve_datasets(
            &AuthContext::anonymous(),
            &requested,
            &catalog(),
            IncludeDatasetResponses::All,
        )
        .unwrap();
        assert_eq!(ids(&resolution), vec!["PUB1"]);
    }
}

//! Query orchestration.
//!
//! [`BeaconService`] runs one request end to end: validate, normalize,
//! resolve the permitted datasets, match each of them concurrently and fold
//! the results into a [`BeaconResponse`]. The whole request runs under a
//! single deadline.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, warn};

use crate::access::levels::AccessLevels;
use crate::access::resolver::resolve_datasets;
use crate::access::AuthContext;
use crate::catalog::store::VariantStore;
use crate::config::QueryConfig;
use crate::core::dataset::Dataset;
use crate::core::query::VariantQuery;
use crate::core::response::BeaconResponse;
use crate::core::types::{AccessLevel, DatasetId, IncludeDatasetResponses};
use crate::error::BeaconError;
use crate::matching::aggregate::aggregate;
use crate::matching::engine::VariantMatcher;
use crate::parsing::normalize::normalize;
use crate::parsing::schema::{validate, QueryCategory};

/// Attribute labels a caller can filter on, for one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteringTerms {
    pub dataset_id: DatasetId,
    pub labels: Vec<String>,
}

/// Entry point for variant queries and dataset metadata lookups
pub struct BeaconService {
    store: Arc<dyn VariantStore>,
    config: QueryConfig,
    matcher: VariantMatcher,
    access_levels: AccessLevels,
}

impl BeaconService {
    /// Build a service over `store`.
    ///
    /// The permit pool sized by `config.max_concurrency` is shared by every
    /// request this service handles.
    pub fn new(store: Arc<dyn VariantStore>, config: QueryConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrency));
        let matcher = VariantMatcher::new(permits, config.retry_backoff);
        Self {
            store,
            config,
            matcher,
            access_levels: AccessLevels::default(),
        }
    }

    /// Withhold result fields according to `levels`
    #[must_use]
    pub fn with_access_levels(mut self, levels: AccessLevels) -> Self {
        self.access_levels = levels;
        self
    }

    #[must_use]
    pub fn access_levels(&self) -> &AccessLevels {
        &self.access_levels
    }

    #[must_use]
    pub fn config(&self) -> QueryConfig {
        self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Answer a query, detecting whether it is a SNP or structural query
    pub async fn handle_query(
        &self,
        payload: &Value,
        auth: &AuthContext,
    ) -> Result<BeaconResponse, BeaconError> {
        self.handle_query_as(payload, auth, QueryCategory::detect(payload))
            .await
    }

    /// Answer a query validated against the given shape.
    ///
    /// # Errors
    ///
    /// - `SchemaValidation` for a payload that fails validation or normalization
    /// - `Unauthorized` when every candidate dataset was withheld
    /// - `Storage` when the dataset listing fails or every dataset fails
    /// - `Timeout` when the request outlives `query_timeout`
    /// - `Internal` when a dataset's match task panics
    pub async fn handle_query_as(
        &self,
        payload: &Value,
        auth: &AuthContext,
        category: QueryCategory,
    ) -> Result<BeaconResponse, BeaconError> {
        let query = normalize(validate(payload, category)?)?;

        info!(
            category = %category,
            reference_name = %query.reference_name,
            assembly = %query.assembly_id,
            datasets = query.dataset_ids.len(),
            filters = query.filters.len(),
            "Handling variant query"
        );

        let started = Instant::now();
        let response = self.with_deadline(self.execute(query, auth)).await?;

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            exists = response.exists,
            "Query complete"
        );
        Ok(response)
    }

    async fn execute(
        &self,
        query: VariantQuery,
        auth: &AuthContext,
    ) -> Result<BeaconResponse, BeaconError> {
        let catalog = self.store.list_datasets(AccessLevel::Controlled).await?;
        let resolution = resolve_datasets(
            auth,
            &query.dataset_ids,
            &catalog,
            query.include_dataset_responses,
        )?;

        let query = Arc::new(query);
        let attempted = resolution.permitted.len();
        let include = if resolution.itemization_allowed {
            query.include_dataset_responses
        } else {
            IncludeDatasetResponses::None
        };

        // Tasks are aborted when the set is dropped, e.g. on timeout
        let mut tasks = JoinSet::new();
        let mut task_datasets: HashMap<task::Id, DatasetId> = HashMap::with_capacity(attempted);
        for dataset in resolution.permitted {
            let id = dataset.id.clone();
            let store = Arc::clone(&self.store);
            let matcher = self.matcher.clone();
            let query = Arc::clone(&query);
            let handle = tasks.spawn(async move {
                matcher.match_dataset(store.as_ref(), &dataset, &query).await
            });
            task_datasets.insert(handle.id(), id);
        }

        let mut results = Vec::with_capacity(attempted);
        let mut failed: Vec<String> = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((task_id, Ok(result))) => {
                    task_datasets.remove(&task_id);
                    results.push(result);
                }
                Ok((task_id, Err(e))) => {
                    let id = dataset_of(&task_datasets, task_id);
                    warn!(dataset = %id, error = %e, "Dataset query failed");
                    failed.push(id);
                }
                Err(e) => {
                    // A panic is a bug in matching, not a storage fault
                    let id = dataset_of(&task_datasets, e.id());
                    error!(dataset = %id, panicked = e.is_panic(), "Dataset query task failed: {e}");
                    return Err(BeaconError::Internal(format!(
                        "match task for dataset {id} failed: {e}"
                    )));
                }
            }
        }

        if attempted > 0 && results.is_empty() {
            return Err(BeaconError::Storage(format!(
                "all {attempted} datasets failed: {}",
                failed.join(", ")
            )));
        }

        let mut response = aggregate(query.echo(), results, include);
        self.access_levels.redact_response(&mut response, auth);
        response.info.not_accessible = resolution.not_accessible;

        for expr in &query.dropped_filters {
            response
                .info
                .warnings
                .push(format!("ignored malformed filter '{expr}'"));
        }
        failed.sort();
        for id in failed {
            response
                .info
                .warnings
                .push(format!("dataset {id} could not be queried"));
        }

        Ok(response)
    }

    /// Datasets the caller may see, sorted by id
    pub async fn visible_datasets(&self, auth: &AuthContext) -> Result<Vec<Dataset>, BeaconError> {
        let mut datasets = self
            .with_deadline(async {
                Ok(self.store.list_datasets(AccessLevel::Controlled).await?)
            })
            .await?;
        datasets.retain(|d| auth.can_see(&d.id, d.access_level));
        datasets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(datasets)
    }

    /// One dataset's metadata.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` both for unknown ids and for datasets the caller
    /// may not see, so existence is not leaked.
    pub async fn dataset(&self, id: &DatasetId, auth: &AuthContext) -> Result<Dataset, BeaconError> {
        let found = self
            .with_deadline(async { Ok(self.store.get_dataset(id).await?) })
            .await?;
        match found {
            Some(dataset) if auth.can_see(&dataset.id, dataset.access_level) => Ok(dataset),
            _ => Err(BeaconError::NotFound(id.clone())),
        }
    }

    /// Filterable attribute labels per visible dataset
    pub async fn filtering_terms(
        &self,
        auth: &AuthContext,
    ) -> Result<Vec<FilteringTerms>, BeaconError> {
        Ok(self
            .visible_datasets(auth)
            .await?
            .into_iter()
            .map(|d| FilteringTerms {
                dataset_id: d.id,
                labels: d.attribute_labels.into_iter().collect(),
            })
            .collect())
    }

    async fn with_deadline<T, F>(&self, fut: F) -> Result<T, BeaconError>
    where
        F: Future<Output = Result<T, BeaconError>>,
    {
        let timeout = self.config.query_timeout;
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Request deadline exceeded");
                Err(BeaconError::Timeout(timeout))
            }
        }
    }
}

fn dataset_of(task_datasets: &HashMap<task::Id, DatasetId>, task_id: task::Id) -> String {
    task_datasets
        .get(&task_id)
        .map_or_else(|| format!("<task {task_id}>"), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::store::CatalogStore;
    use serde_json::json;

    fn service() -> BeaconService {
        let store = CatalogStore::load_embedded().unwrap();
        BeaconService::new(Arc::new(store), QueryConfig::default())
    }

    #[tokio::test]
    async fn test_demo_snp_hit() {
        let svc = service();
        let payload = json!({
            "referenceName": "Y",
            "start": 2655179,
            "referenceBases": "G",
            "alternateBases": "A",
            "assemblyId": "GRCh37",
            "includeDatasetResponses": "HIT"
        });
        let response = svc.handle_query(&payload, &AuthContext::anonymous()).await.unwrap();
        assert!(response.exists);
        let ids: Vec<&str> = response.hits().map(|r| r.dataset_id.as_str()).collect();
        assert_eq!(ids, vec!["EGAD00001000740"]);
    }

    #[tokio::test]
    async fn test_registered_dataset_needs_login() {
        let svc = service();
        let payload = json!({
            "referenceName": "Y",
            "start": 2655179,
            "alternateBases": "A",
            "assemblyId": "GRCh37",
            "datasetIds": ["EGAD00001000742"]
        });
        let err = svc
            .handle_query(&payload, &AuthContext::anonymous())
            .await
            .unwrap_err();
        assert!(matches!(err, BeaconError::Unauthorized { authenticated: false }));

        let ok = svc
            .handle_query(&payload, &AuthContext::authenticated([]))
            .await
            .unwrap();
        assert!(ok.exists);
    }

    #[tokio::test]
    async fn test_dropped_filter_warning() {
        let svc = service();
        let payload = json!({
            "referenceName": "Y",
            "start": 2655179,
            "alternateBases": "A",
            "assemblyId": "GRCh37",
            "filters": ["bad_filter", "sex:male"]
        });
        let response = svc.handle_query(&payload, &AuthContext::anonymous()).await.unwrap();
        assert!(response.exists);
        assert_eq!(response.info.warnings, vec!["ignored malformed filter 'bad_filter'"]);
    }

    #[tokio::test]
    async fn test_visible_datasets_and_lookup() {
        let svc = service();
        let anon = AuthContext::anonymous();
        let visible = svc.visible_datasets(&anon).await.unwrap();
        assert_eq!(visible.len(), 2);

        let hidden = DatasetId::new("EGAD00001000743");
        assert!(matches!(
            svc.dataset(&hidden, &anon).await,
            Err(BeaconError::NotFound(_))
        ));
        let granted = AuthContext::authenticated([hidden.clone()]);
        assert_eq!(svc.dataset(&hidden, &granted).await.unwrap().id, hidden);
    }

    #[tokio::test]
    async fn test_filtering_terms() {
        let svc = service();
        let terms = svc.filtering_terms(&AuthContext::anonymous()).await.unwrap();
        let first = &terms[0];
        assert_eq!(first.dataset_id.as_str(), "EGAD00001000740");
        assert!(first.labels.contains(&"sex".to_string()));
    }
}

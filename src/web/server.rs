use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::access::levels::{AccessLevels, DatasetOverrides, FieldGroup};
use crate::access::tokens::TokenRegistry;
use crate::access::AuthContext;
use crate::catalog::store::CatalogStore;
use crate::cli::ServeArgs;
use crate::config::{BeaconInfo, Handover, ServiceInfo};
use crate::core::dataset::Dataset;
use crate::core::response::{BeaconResponse, VariantFound};
use crate::core::types::{AccessLevel, DatasetId};
use crate::error::{BeaconError, SchemaValidationError};
use crate::parsing::schema::QueryCategory;
use crate::service::{BeaconService, FilteringTerms};
use crate::utils::validation::check_token;

/// Request body limit; queries are small JSON documents
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Requests handled at once before callers queue
pub const MAX_CONCURRENT_REQUESTS: usize = 100;

/// Added to the query deadline so the service reports its own timeout first
pub const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// `model` value selecting the GA4GH service-info rendering on `/info`
pub const SERVICE_INFO_MODEL: &str = "GA4GH-ServiceInfo-v0.1";

/// GET parameters converted to integers before validation
const INTEGER_PARAMS: [&str; 6] = ["start", "end", "startMin", "startMax", "endMin", "endMax"];

/// GET parameters holding comma-separated lists
const LIST_PARAMS: [&str; 2] = ["datasetIds", "filters"];

/// Shared application state
pub struct AppState {
    pub service: BeaconService,
    pub info: BeaconInfo,
    pub tokens: TokenRegistry,
}

impl AppState {
    /// Load the catalog, metadata and tokens named by the serve arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be read or parsed, or if the query
    /// limits are invalid.
    pub fn from_args(args: &ServeArgs) -> anyhow::Result<Self> {
        let store = match &args.catalog {
            Some(path) => CatalogStore::load_from_file(path)?,
            None => CatalogStore::load_embedded()?,
        };
        let info = match &args.info {
            Some(path) => BeaconInfo::load_from_file(path)?,
            None => BeaconInfo::load_embedded()?,
        };
        let tokens = match &args.tokens {
            Some(path) => TokenRegistry::load_from_file(path)?,
            None => TokenRegistry::new(),
        };
        let access_levels = match &args.access_levels {
            Some(path) => AccessLevels::load_from_file(path)?,
            None => AccessLevels::load_embedded()?,
        };
        let config = args.query_config();
        config.validate()?;

        let datasets = store.len();
        let service = BeaconService::new(Arc::new(store), config).with_access_levels(access_levels);

        info!(
            backend = service.backend_name(),
            datasets,
            tokens = tokens.len(),
            max_concurrency = config.max_concurrency,
            "Loaded beacon state"
        );

        Ok(Self {
            service,
            info,
            tokens,
        })
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_code: u16,
    pub error_type: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// HTTP status for each error kind
pub fn status_for(err: &BeaconError) -> StatusCode {
    match err {
        BeaconError::SchemaValidation(_) => StatusCode::BAD_REQUEST,
        BeaconError::Unauthorized {
            authenticated: false,
        } => StatusCode::UNAUTHORIZED,
        BeaconError::Unauthorized {
            authenticated: true,
        } => StatusCode::FORBIDDEN,
        BeaconError::NotFound(_) => StatusCode::NOT_FOUND,
        BeaconError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        BeaconError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        BeaconError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Create a safe error response that prevents information disclosure
/// while logging detailed errors server-side for debugging
pub fn create_safe_error_response(err: &BeaconError) -> (StatusCode, ErrorResponse) {
    let status = status_for(err);
    let (message, field) = match err {
        BeaconError::SchemaValidation(e) => (e.to_string(), Some(e.field.clone())),
        BeaconError::Storage(details) => {
            tracing::error!("Internal error (Storage): {}", details);
            ("the variant store could not answer the query".to_string(), None)
        }
        BeaconError::Internal(details) => {
            tracing::error!("Internal error: {}", details);
            ("the query could not be completed".to_string(), None)
        }
        other => (other.to_string(), None),
    };

    (
        status,
        ErrorResponse {
            error: ErrorBody {
                error_code: status.as_u16(),
                error_type: err.error_type().to_string(),
                error_message: message,
                field,
            },
        },
    )
}

/// Handler error wrapper so `?` works on `BeaconError`
pub struct ApiError(pub BeaconError);

impl<E: Into<BeaconError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = create_safe_error_response(&self.0);
        (status, Json(body)).into_response()
    }
}

/// Query answer with the service identity attached
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub beacon_id: String,
    pub api_version: String,
    #[serde(flatten)]
    pub response: BeaconResponse,
}

/// Answer of the genomic endpoints, adding one entry per distinct variant
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenomicQueryResponse {
    #[serde(flatten)]
    pub answer: QueryResponse,
    pub variants_found: Vec<VariantFound>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub beacon_handover: Vec<Handover>,
}

/// Public view of a dataset
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub id: DatasetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub assembly_id: String,
    pub variant_count: u64,
    pub sample_count: u64,
    pub call_count: u64,
    pub access_type: AccessLevel,
}

impl From<Dataset> for DatasetSummary {
    fn from(d: Dataset) -> Self {
        Self {
            id: d.id,
            name: d.name,
            description: d.description,
            assembly_id: d.assembly_id,
            variant_count: d.variant_count,
            sample_count: d.sample_count,
            call_count: d.call_count,
            access_type: d.access_level,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoResponse<'a> {
    #[serde(flatten)]
    info: &'a BeaconInfo,
    datasets: Vec<DatasetSummary>,
}

#[derive(Debug, Serialize)]
struct FilteringTermsResponse {
    #[serde(rename = "filteringTerms")]
    filtering_terms: Vec<FilteringTerms>,
}

#[derive(Debug, Deserialize)]
struct InfoParams {
    model: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ListFormat {
    #[default]
    Long,
    Short,
}

/// Filters accepted by `/services`
#[derive(Debug, Default, PartialEq, Eq)]
struct ServicesRequest {
    service_type: Option<String>,
    api_version: Option<String>,
    list_format: ListFormat,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AccessLevelFields {
    Summary(BTreeMap<String, AccessLevel>),
    Detailed(BTreeMap<String, FieldGroup>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessLevelsResponse {
    id: String,
    name: String,
    api_version: String,
    fields: AccessLevelFields,
    /// Overrides for the datasets visible to the caller
    datasets: BTreeMap<DatasetId, DatasetOverrides>,
}

/// Run the web server
///
/// # Errors
///
/// Returns an error if the tokio runtime cannot be created or the server fails to start.
pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args).await })
}

/// Create the application router with all routes and middleware configured.
///
/// Per-IP rate limiting needs the peer address, so it is added by the socket
/// server rather than here.
pub fn create_router(state: Arc<AppState>) -> Router {
    let request_timeout = state.service.config().query_timeout + HTTP_TIMEOUT_MARGIN;

    Router::new()
        .route("/", get(info_handler))
        .route("/info", get(info_handler))
        .route("/service-info", get(service_info_handler))
        .route("/query", get(query_get).post(query_post))
        .route("/genomic_snp", get(snp_get).post(snp_post))
        .route("/genomic_region", get(region_get).post(region_post))
        .route("/filtering_terms", get(filtering_terms_handler))
        .route("/services", get(services_get).post(services_post))
        .route("/access_levels", get(access_levels_get).post(access_levels_post))
        .route("/datasets/{id}", get(dataset_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // Security headers for browser protection
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("strict-transport-security"),
                    HeaderValue::from_static("max-age=31536000; includeSubDomains"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("referrer-policy"),
                    HeaderValue::from_static("no-referrer"),
                ))
                // Request timeout to prevent slow client attacks
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                ))
                .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_args(&args)?);

    // Configure IP-based rate limiting
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10) // 10 requests per second per IP
        .burst_size(50) // Allow bursts of 50 requests
        .finish()
        .unwrap();

    let app = create_router(state).layer(GovernorLayer {
        config: Arc::new(governor_conf),
    });

    let addr = format!("{}:{}", args.address, args.port);
    info!("Starting beacon at http://{addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn auth_from_headers(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, BeaconError> {
    let value = match headers.get(header::AUTHORIZATION) {
        Some(v) => Some(v.to_str().map_err(|_| BeaconError::Unauthorized {
            authenticated: false,
        })?),
        None => None,
    };
    state.tokens.authenticate(value)
}

/// Convert GET parameters to the JSON payload shape
pub fn params_to_payload(params: Vec<(String, String)>) -> Value {
    let mut payload = Map::new();
    for (key, value) in params {
        if LIST_PARAMS.contains(&key.as_str()) {
            let items = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()));
            let entry = payload
                .entry(key)
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(list) = entry {
                list.extend(items);
            }
        } else if INTEGER_PARAMS.contains(&key.as_str()) {
            let parsed = value
                .trim()
                .parse::<u64>()
                .map_or_else(|_| Value::String(value.clone()), Value::from);
            payload.insert(key, parsed);
        } else {
            payload.insert(key, Value::String(value));
        }
    }
    Value::Object(payload)
}

fn parse_body(body: &Bytes) -> Result<Value, BeaconError> {
    serde_json::from_slice(body)
        .map_err(|_| SchemaValidationError::new("body", "must be a valid JSON document").into())
}

/// Parameter endpoints accept an empty POST body as "no parameters"
fn parse_optional_body(body: &Bytes) -> Result<Value, BeaconError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    parse_body(body)
}

/// GET parameters as a JSON object of strings
fn params_to_object(params: Vec<(String, String)>) -> Value {
    Value::Object(
        params
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    )
}

async fn run_query(
    state: &AppState,
    headers: &HeaderMap,
    payload: Value,
    category: Option<QueryCategory>,
) -> Result<BeaconResponse, ApiError> {
    let auth = auth_from_headers(state, headers)?;
    let response = match category {
        Some(category) => {
            state
                .service
                .handle_query_as(&payload, &auth, category)
                .await?
        }
        None => state.service.handle_query(&payload, &auth).await?,
    };
    Ok(response)
}

fn with_identity(state: &AppState, response: BeaconResponse) -> QueryResponse {
    QueryResponse {
        beacon_id: state.info.id.clone(),
        api_version: state.info.api_version.clone(),
        response,
    }
}

async fn answer(
    state: &AppState,
    headers: &HeaderMap,
    payload: Value,
) -> Result<Json<QueryResponse>, ApiError> {
    let response = run_query(state, headers, payload, None).await?;
    Ok(Json(with_identity(state, response)))
}

async fn answer_genomic(
    state: &AppState,
    headers: &HeaderMap,
    payload: Value,
    category: QueryCategory,
) -> Result<Json<GenomicQueryResponse>, ApiError> {
    let mut response = run_query(state, headers, payload, Some(category)).await?;
    let variants_found = std::mem::take(&mut response.variants_found);
    Ok(Json(GenomicQueryResponse {
        answer: with_identity(state, response),
        variants_found,
        beacon_handover: state.info.beacon_handover(),
    }))
}

async fn query_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<QueryResponse>, ApiError> {
    answer(&state, &headers, params_to_payload(params)).await
}

async fn query_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<QueryResponse>, ApiError> {
    answer(&state, &headers, parse_body(&body)?).await
}

async fn snp_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<GenomicQueryResponse>, ApiError> {
    let payload = params_to_payload(params);
    answer_genomic(&state, &headers, payload, QueryCategory::Snp).await
}

async fn snp_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GenomicQueryResponse>, ApiError> {
    let payload = parse_body(&body)?;
    answer_genomic(&state, &headers, payload, QueryCategory::Snp).await
}

async fn region_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<GenomicQueryResponse>, ApiError> {
    let payload = params_to_payload(params);
    answer_genomic(&state, &headers, payload, QueryCategory::Structural).await
}

async fn region_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GenomicQueryResponse>, ApiError> {
    let payload = parse_body(&body)?;
    answer_genomic(&state, &headers, payload, QueryCategory::Structural).await
}

/// Beacon metadata plus the datasets visible to the caller
async fn info_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<InfoParams>,
) -> Result<Response, ApiError> {
    match params.model.as_deref() {
        None => {}
        Some(SERVICE_INFO_MODEL) => {
            return Ok(Json(state.info.service_info()).into_response());
        }
        Some(_) => {
            return Err(SchemaValidationError::new(
                "model",
                format!("must be '{SERVICE_INFO_MODEL}'"),
            )
            .into());
        }
    }

    let auth = auth_from_headers(&state, &headers)?;
    let datasets = state
        .service
        .visible_datasets(&auth)
        .await?
        .into_iter()
        .map(DatasetSummary::from)
        .collect();

    Ok(Json(InfoResponse {
        info: &state.info,
        datasets,
    })
    .into_response())
}

async fn service_info_handler(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(state.info.service_info())
}

async fn filtering_terms_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<FilteringTermsResponse>, ApiError> {
    let auth = auth_from_headers(&state, &headers)?;
    let filtering_terms = state.service.filtering_terms(&auth).await?;
    Ok(Json(FilteringTermsResponse { filtering_terms }))
}

fn string_param<'a>(key: &str, value: &'a Value) -> Result<&'a str, BeaconError> {
    let text = value
        .as_str()
        .ok_or_else(|| SchemaValidationError::new(key, "must be a string"))?;
    if let Some(problem) = check_token(text) {
        return Err(SchemaValidationError::new(key, problem).into());
    }
    Ok(text)
}

fn parse_services_request(payload: &Value) -> Result<ServicesRequest, BeaconError> {
    let Value::Object(params) = payload else {
        return Err(SchemaValidationError::new("body", "must be a JSON object").into());
    };

    let mut request = ServicesRequest::default();
    for (key, value) in params {
        match key.as_str() {
            "serviceType" => request.service_type = Some(string_param(key, value)?.to_string()),
            "apiVersion" => request.api_version = Some(string_param(key, value)?.to_string()),
            "listFormat" => {
                request.list_format = match string_param(key, value)? {
                    "long" | "full" => ListFormat::Long,
                    "short" => ListFormat::Short,
                    _ => {
                        return Err(
                            SchemaValidationError::new(key, "must be 'short' or 'long'").into()
                        )
                    }
                };
            }
            "model" => {
                return Err(SchemaValidationError::new(key, "is not supported on /services").into())
            }
            _ => return Err(SchemaValidationError::new(key, "is not a recognized parameter").into()),
        }
    }
    Ok(request)
}

/// Services known to this beacon, which is only itself
fn list_services(state: &AppState, payload: &Value) -> Result<Response, ApiError> {
    let request = parse_services_request(payload)?;
    let info = &state.info;
    let listed = request
        .service_type
        .as_ref()
        .map_or(true, |t| *t == info.service_type)
        && request
            .api_version
            .as_ref()
            .map_or(true, |v| *v == info.api_version);
    let services: Vec<&BeaconInfo> = if listed { vec![info] } else { Vec::new() };

    let body = match request.list_format {
        ListFormat::Long => {
            let rows: Vec<_> = services.into_iter().map(BeaconInfo::service_entry).collect();
            Json(rows).into_response()
        }
        ListFormat::Short => {
            let rows: Vec<_> = services.into_iter().map(BeaconInfo::service_summary).collect();
            Json(rows).into_response()
        }
    };
    Ok(body)
}

async fn services_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    list_services(&state, &params_to_object(params))
}

async fn services_post(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    list_services(&state, &parse_optional_body(&body)?)
}

/// Only `includeFieldDetails=true` is accepted
fn include_field_details(payload: &Value) -> Result<bool, BeaconError> {
    let Value::Object(params) = payload else {
        return Err(SchemaValidationError::new("body", "must be a JSON object").into());
    };

    let mut details = false;
    for (key, value) in params {
        if key != "includeFieldDetails" {
            return Err(SchemaValidationError::new(
                key,
                "is not a recognized parameter; only includeFieldDetails=true is accepted",
            )
            .into());
        }
        match value {
            Value::Bool(true) => details = true,
            Value::String(s) if s == "true" => details = true,
            _ => return Err(SchemaValidationError::new(key, "must be true").into()),
        }
    }
    Ok(details)
}

async fn describe_access_levels(
    state: &AppState,
    headers: &HeaderMap,
    payload: &Value,
) -> Result<Json<AccessLevelsResponse>, ApiError> {
    let details = include_field_details(payload)?;
    let auth = auth_from_headers(state, headers)?;
    let visible = state.service.visible_datasets(&auth).await?;
    let levels = state.service.access_levels();

    let fields = if details {
        AccessLevelFields::Detailed(levels.fields.clone())
    } else {
        AccessLevelFields::Summary(levels.summary())
    };
    Ok(Json(AccessLevelsResponse {
        id: state.info.id.clone(),
        name: state.info.name.clone(),
        api_version: state.info.api_version.clone(),
        fields,
        datasets: levels.overrides_for(visible.iter().map(|d| &d.id)),
    }))
}

async fn access_levels_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<AccessLevelsResponse>, ApiError> {
    describe_access_levels(&state, &headers, &params_to_object(params)).await
}

async fn access_levels_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AccessLevelsResponse>, ApiError> {
    let payload = parse_optional_body(&body)?;
    describe_access_levels(&state, &headers, &payload).await
}

async fn dataset_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DatasetSummary>, ApiError> {
    let auth = auth_from_headers(&state, &headers)?;
    let dataset = state.service.dataset(&DatasetId::new(id), &auth).await?;
    Ok(Json(DatasetSummary::from(dataset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_params_to_payload() {
        let payload = params_to_payload(pairs(&[
            ("referenceName", "1"),
            ("start", "100"),
            ("end", "abc"),
            ("datasetIds", "A, B,,C"),
            ("filters", "age:>30"),
            ("filters", "sex:male"),
        ]));
        assert_eq!(
            payload,
            json!({
                "referenceName": "1",
                "start": 100,
                "end": "abc",
                "datasetIds": ["A", "B", "C"],
                "filters": ["age:>30", "sex:male"]
            })
        );
    }

    #[test]
    fn test_services_request_parsing() {
        let request = parse_services_request(&json!({
            "serviceType": "GA4GHBeacon",
            "listFormat": "short"
        }))
        .unwrap();
        assert_eq!(request.service_type.as_deref(), Some("GA4GHBeacon"));
        assert_eq!(request.list_format, ListFormat::Short);
        assert_eq!(
            parse_services_request(&json!({})).unwrap(),
            ServicesRequest::default()
        );

        let field = |payload: Value| match parse_services_request(&payload) {
            Err(BeaconError::SchemaValidation(e)) => e.field,
            other => panic!("expected a validation error, got {other:?}"),
        };
        assert_eq!(field(json!({"listFormat": "tiny"})), "listFormat");
        assert_eq!(field(json!({"model": "Beacon-v1"})), "model");
        assert_eq!(field(json!({"colour": "blue"})), "colour");
        assert_eq!(field(json!({"apiVersion": 1})), "apiVersion");
        assert_eq!(field(json!(["serviceType"])), "body");
    }

    #[test]
    fn test_include_field_details() {
        assert!(!include_field_details(&json!({})).unwrap());
        assert!(include_field_details(&json!({"includeFieldDetails": "true"})).unwrap());
        assert!(include_field_details(&json!({"includeFieldDetails": true})).unwrap());
        assert!(include_field_details(&json!({"includeFieldDetails": "false"})).is_err());
        assert!(include_field_details(&json!({"datasetId": "x"})).is_err());
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                BeaconError::SchemaValidation(SchemaValidationError::new("start", "x")),
                400,
            ),
            (BeaconError::Unauthorized { authenticated: false }, 401),
            (BeaconError::Unauthorized { authenticated: true }, 403),
            (BeaconError::NotFound(DatasetId::new("D")), 404),
            (BeaconError::Storage("boom".into()), 500),
            (BeaconError::Timeout(Duration::from_secs(1)), 504),
            (BeaconError::Internal("task panicked".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(status_for(&err).as_u16(), code, "{err}");
        }
    }

    #[test]
    fn test_storage_details_hidden() {
        let (status, body) =
            create_safe_error_response(&BeaconError::Storage("password=hunter2".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.error_message.contains("hunter2"));
        assert_eq!(body.error.error_type, "Storage");
    }

    #[test]
    fn test_internal_details_hidden() {
        let (status, body) =
            create_safe_error_response(&BeaconError::Internal("dataset D1: index out of bounds".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.error_message.contains("D1"));
        assert_eq!(body.error.error_type, "Internal");
    }

    #[test]
    fn test_validation_error_names_field() {
        let err = BeaconError::SchemaValidation(SchemaValidationError::new("assemblyId", "bad"));
        let (_, body) = create_safe_error_response(&err);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"]["field"], "assemblyId");
        assert_eq!(json["error"]["errorCode"], 400);
    }
}

//! REST API handlers for insight discovery, insight retrieval, rule checks
//! and operational endpoints.

use adwatch_core::error::AdWatchError;
use adwatch_core::insight::{BreakdownMode, InsightResult};
use adwatch_core::rule::ServiceParam;
use adwatch_core::types::{MetricField, TargetOption, TimeRange};
use adwatch_integrations::{AdsClient, ClientSession};
use adwatch_reporting::{InsightNormalizer, ResourceTreeWalker};
use adwatch_rules::{PassReport, RuleEvaluator};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn AdsClient>,
    pub evaluator: Arc<RuleEvaluator>,
    /// Session built from the process-default credentials.
    pub default_session: ClientSession,
    pub ad_user: String,
    pub legacy_ad_leaf: bool,
    pub node_id: String,
    pub start_time: Instant,
}

impl AppState {
    fn session_for(&self, service: Option<&ServiceParam>) -> ClientSession {
        match service {
            Some(param) => ClientSession::new(
                param.credentials().clone(),
                self.default_session.api_version(),
            ),
            None => self.default_session.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TargetsRequest {
    #[serde(default)]
    pub service: Option<ServiceParam>,
}

#[derive(Debug, Deserialize)]
pub struct InsightRequest {
    pub insight: String,
    #[serde(default)]
    pub timerange: Option<TimeRange>,
    #[serde(default)]
    pub fields: Option<Vec<MetricField>>,
    #[serde(default)]
    pub action_breakdown: bool,
    #[serde(default)]
    pub service: Option<ServiceParam>,
}

/// GET /v1/insight-targets — Flattened account/campaign/ad set/ad list.
pub async fn list_targets(
    State(state): State<AppState>,
) -> Result<Json<Vec<TargetOption>>, ApiError> {
    targets(state, TargetsRequest::default()).await
}

/// POST /v1/insight-targets — Same listing using the given credentials.
pub async fn list_targets_with(
    State(state): State<AppState>,
    Json(request): Json<TargetsRequest>,
) -> Result<Json<Vec<TargetOption>>, ApiError> {
    targets(state, request).await
}

async fn targets(
    state: AppState,
    request: TargetsRequest,
) -> Result<Json<Vec<TargetOption>>, ApiError> {
    let session = state.session_for(request.service.as_ref());
    let walker = ResourceTreeWalker::new(state.client.clone(), session)
        .with_ad_user(state.ad_user.clone())
        .with_legacy_ad_leaf(state.legacy_ad_leaf);
    let targets = run_blocking(move || walker.list_all_insight_targets()).await?;
    Ok(Json(targets))
}

/// POST /v1/insights — Normalized insights for one target token.
pub async fn fetch_insight(
    State(state): State<AppState>,
    Json(request): Json<InsightRequest>,
) -> Result<Json<InsightResult>, ApiError> {
    let session = state.session_for(request.service.as_ref());
    let normalizer = InsightNormalizer::new(state.client.clone());
    let result = run_blocking(move || {
        normalizer.fetch_insights(
            &session,
            &request.insight,
            request.timerange,
            request.fields,
            BreakdownMode::from_flag(request.action_breakdown),
            Local::now().date_naive(),
        )
    })
    .await?;
    Ok(Json(result))
}

/// POST /v1/rules/check — Run one rule evaluation pass now.
pub async fn check_rules(State(state): State<AppState>) -> Result<Json<PassReport>, ApiError> {
    let evaluator = state.evaluator.clone();
    let report = run_blocking(move || evaluator.run_pass()).await?;
    Ok(Json(report))
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /live — Liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Client calls block; keep them off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, AdWatchError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::from(AdWatchError::Internal(e.into())))?
        .map_err(ApiError::from)
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

/// An [`AdWatchError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AdWatchError);

impl From<AdWatchError> for ApiError {
    fn from(e: AdWatchError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self.0 {
            AdWatchError::InvalidTarget(_) => (StatusCode::BAD_REQUEST, "invalid_target"),
            AdWatchError::Validation(_) | AdWatchError::InvalidRule(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request")
            }
            AdWatchError::MissingData { .. } => (StatusCode::NOT_FOUND, "missing_data"),
            AdWatchError::ResourceFetch { .. } => (StatusCode::BAD_GATEWAY, "resource_fetch_failed"),
            AdWatchError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            warn!(error = %self.0, "Request rejected");
        }
        metrics::counter!("api.errors", "code" => code).increment(1);
        (
            status,
            Json(ErrorResponse {
                error: code.to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

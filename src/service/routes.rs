//! Axum routes for the documentation service.

use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::{ManualInfo, ManualTopics, FAILED_TO_READ_REQUEST};
use crate::engine::{BatchRequest, ConflictRecord};
use crate::error::DocsError;
use crate::nav::ManualSummary;
use crate::resolver::Resolution;
use crate::store::{ContentStore, InMemoryWiki};
use crate::toc::{CacheStats, TocSaveOutcome};
use crate::types::{ContentKey, OrderedMap, RequestContext};

use super::middleware::{record_batch_metrics, record_resolution};
use super::state::{request_context, ServiceState};

/// Type alias for the service state over the in-memory wiki.
pub type AppState = ServiceState<InMemoryWiki>;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query for the topic listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsQuery {
    /// Version the topics come from.
    pub source: String,
    /// Version the topics would be applied to.
    pub target: String,
    /// Comma-separated manual short names.
    pub manuals: String,
    /// Restrict the listing to one unit key.
    pub title: Option<String>,
}

/// A freshly issued job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    /// Job id.
    pub job_id: String,
}

/// Progress of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    /// Job id.
    pub job_id: String,
    /// Human-readable progress.
    pub progress: String,
}

/// Request to process a batch under a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// Source version.
    pub source: String,
    /// Target version.
    pub target: String,
    /// Topic actions, as a JSON object or a string holding one.
    pub topic_actions: serde_json::Value,
}

/// Query for a conflict check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictsQuery {
    /// Unit key.
    pub title: String,
    /// Version the unit would take on.
    pub target: String,
}

/// Request to detach version tags from a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetachRequest {
    /// Unit key.
    pub title: String,
    /// Version names to detach.
    pub versions: Vec<String>,
}

/// Request to save a TOC document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveTocRequest {
    /// TOC key, e.g. `Documentation:UserTOC2.0`.
    pub key: String,
    /// Raw TOC markup.
    pub content: String,
}

/// Query for alias resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveQuery {
    /// Path in any documentation form.
    pub path: String,
}

/// A rendered topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicPage {
    /// Unit served.
    pub key: ContentKey,
    /// Version it was served for.
    pub version: String,
    /// Content with documentation links rewritten.
    pub content: String,
    /// Link to the previous topic in the TOC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    /// Link to the next topic in the TOC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub versions: usize,
    pub manuals: usize,
    pub definitions_fingerprint: String,
    pub uptime_secs: u64,
    /// TOC cache counters; absent when the cache is disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toc_cache: Option<CacheStats>,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// Readiness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub details: Option<String>,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        tracing::warn!(code = %self.code, error = %self.error, "Request error");
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

fn status_for(e: &DocsError) -> StatusCode {
    match e {
        DocsError::UnknownVersion(_) | DocsError::UnknownManual(_) | DocsError::UnresolvableTopic(_) => {
            StatusCode::NOT_FOUND
        }
        DocsError::TagConflict(_) | DocsError::TopicExists(_) => StatusCode::CONFLICT,
        DocsError::DuplicateTopicTitle(_) | DocsError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        DocsError::ContentStore(_) | DocsError::Index(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn docs_error(e: DocsError) -> ApiError {
    let status = status_for(&e);
    if status.is_server_error() {
        tracing::error!(error = %e, kind = e.kind(), "Store failure");
    }
    (status, Json(ErrorResponse::new(e.kind(), e.to_string())))
}

fn require_author(state: &AppState, ctx: &RequestContext) -> Result<(), ApiError> {
    if state.kernel.is_author(ctx.user()) {
        return Ok(());
    }
    Err((
        StatusCode::FORBIDDEN,
        Json(ErrorResponse::new("Forbidden", "Branch/inherit requires author rights").with_details(ctx.user().name.clone())),
    ))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Manuals with a TOC for a version.
async fn manuals_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(version): Path<String>,
) -> Result<Json<Vec<ManualInfo>>, ApiError> {
    let mut ctx = request_context(&headers);
    let manuals = state
        .kernel
        .fetch_manuals(&mut ctx, &version)
        .await
        .map_err(docs_error)?;
    Ok(Json(manuals))
}

/// Topics of the source TOCs with their conflicts against the target.
async fn topics_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TopicsQuery>,
) -> Result<Json<OrderedMap<ManualTopics>>, ApiError> {
    require_author(&state, &request_context(&headers))?;
    let manuals: Vec<String> = query.manuals.split(',').map(str::to_string).collect();
    let topics = state
        .kernel
        .fetch_topics(&query.source, &query.target, &manuals, query.title.as_deref())
        .await
        .map_err(docs_error)?;
    Ok(Json(topics))
}

/// Issue a job id.
async fn new_job_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<JobResponse>, ApiError> {
    require_author(&state, &request_context(&headers))?;
    Ok(Json(JobResponse {
        job_id: state.kernel.fetch_job_id().to_string(),
    }))
}

/// Progress text of a job.
async fn progress_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Json<ProgressResponse> {
    Json(ProgressResponse {
        progress: state.kernel.fetch_job_progress(&id),
        job_id: id,
    })
}

/// Run a batch and return its log as plain text.
async fn process_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<ProcessRequest>,
) -> Result<String, ApiError> {
    require_author(&state, &request_context(&headers))?;
    let job = crate::jobs::JobId::from_string(id);
    let payload = match request.topic_actions {
        serde_json::Value::String(raw) => raw,
        other => other.to_string(),
    };

    let batch = BatchRequest::from_json(&payload).map_err(|e| {
        state.kernel.jobs().close_job(&job);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(e.kind(), FAILED_TO_READ_REQUEST).with_details(e.to_string())),
        )
    })?;

    let report = match state
        .kernel
        .run_batch(&job, &request.source, &request.target, &batch)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            state.kernel.jobs().close_job(&job);
            return Err(docs_error(e));
        }
    };

    record_batch_metrics(
        report.outcomes.len(),
        report.failures().count(),
        report.elapsed.as_millis() as u64,
    );
    Ok(report.log.render())
}

/// Units already serving the target version.
async fn conflicts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConflictsQuery>,
) -> Result<Json<ConflictRecord>, ApiError> {
    let record = state
        .kernel
        .conflicts(&ContentKey::new(query.title), &query.target)
        .await
        .map_err(docs_error)?;
    Ok(Json(record))
}

/// Detach version tags from a unit.
async fn detach_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<DetachRequest>,
) -> Result<StatusCode, ApiError> {
    require_author(&state, &request_context(&headers))?;
    state
        .kernel
        .detach_tags(&ContentKey::new(request.title), &request.versions)
        .await
        .map_err(docs_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Save a TOC document.
async fn save_toc_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SaveTocRequest>,
) -> Result<Json<TocSaveOutcome>, ApiError> {
    require_author(&state, &request_context(&headers))?;
    let outcome = state
        .kernel
        .save_toc(&ContentKey::new(request.key), &request.content)
        .await
        .map_err(docs_error)?;
    Ok(Json(outcome))
}

/// Navigation summary for a version.
async fn nav_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(version): Path<String>,
) -> Result<Json<Vec<ManualSummary>>, ApiError> {
    let mut ctx = request_context(&headers);
    let nav = state
        .kernel
        .navigation(&mut ctx, &version)
        .await
        .map_err(docs_error)?;
    Ok(Json(nav.as_ref().clone()))
}

/// Resolve a path and report the outcome without following it.
async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<Resolution>, ApiError> {
    let ctx = request_context(&headers);
    let resolution = state.kernel.resolve(&ctx, &query.path).await.map_err(docs_error)?;
    record_resolution(resolution_kind(&resolution));
    Ok(Json(resolution))
}

/// Serve an aliased documentation path.
async fn document_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(rest): Path<String>,
) -> Result<Response, ApiError> {
    let ctx = request_context(&headers);
    let path = format!("{}/{}", crate::DOC_NAMESPACE, rest);
    let resolution = state.kernel.resolve(&ctx, &path).await.map_err(docs_error)?;
    record_resolution(resolution_kind(&resolution));

    match resolution {
        Resolution::Concrete { key, version } => {
            let page = render_topic(&state, ctx, key, version).await.map_err(docs_error)?;
            Ok(Json(page).into_response())
        }
        Resolution::Redirect { location } => Ok(Redirect::temporary(&location).into_response()),
        Resolution::NotFound => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("NotFound", "No topic at this path").with_details(path)),
        )),
    }
}

async fn render_topic(
    state: &AppState,
    ctx: RequestContext,
    key: ContentKey,
    version: String,
) -> Result<TopicPage, DocsError> {
    let kernel = &state.kernel;
    let raw = kernel
        .store()
        .read(&key)
        .await
        .map_err(DocsError::content_store)?
        .unwrap_or_default();

    let ctx = ctx.with_selected_version(version.clone());
    let content = kernel.resolver().rewrite_links(&ctx, Some(&key), &raw).await?;

    let (prev, next) = match key.parse_topic() {
        Some(parts) => {
            let toc = kernel.toc().load(&parts.topic.manual, &version).await?;
            let around = toc.neighbors(&key);
            (
                around.prev.and_then(|e| e.link.clone()),
                around.next.and_then(|e| e.link.clone()),
            )
        }
        None => (None, None),
    };

    Ok(TopicPage {
        key,
        version,
        content,
        prev,
        next,
    })
}

fn resolution_kind(resolution: &Resolution) -> &'static str {
    match resolution {
        Resolution::Concrete { .. } => "concrete",
        Resolution::Redirect { .. } => "redirect",
        Resolution::NotFound => "notfound",
    }
}

/// Health check endpoint (detailed).
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let kernel = &state.kernel;
    let versions = kernel.registry().all().len();
    Json(HealthResponse {
        status: if versions > 0 { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        versions,
        manuals: kernel.manuals().manuals().len(),
        definitions_fingerprint: state.definitions_fingerprint(),
        uptime_secs: state.uptime_secs(),
        toc_cache: kernel.toc().cache().stats(),
    })
}

/// Liveness probe endpoint.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Ready once at least one version is defined.
async fn readiness_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.kernel.registry().all().is_empty() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                details: Some("No versions defined".to_string()),
            }),
        ));
    }
    Ok(Json(ReadinessResponse {
        ready: true,
        details: None,
    }))
}

/// Re-read definitions and drop caches.
async fn reload_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    require_author(&state, &request_context(&headers))?;
    state.kernel.reload_definitions().await.map_err(docs_error)?;
    tracing::info!(fingerprint = %state.definitions_fingerprint(), "Reloaded definitions");
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the documentation service.
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Branch/inherit
        .route("/api/manuals/:version", get(manuals_handler))
        .route("/api/topics", get(topics_handler))
        .route("/api/jobs", post(new_job_handler))
        .route("/api/jobs/:id", get(progress_handler))
        .route("/api/jobs/:id/process", post(process_handler))
        .route("/api/conflicts", get(conflicts_handler))
        .route("/api/tags/detach", post(detach_handler))
        // TOCs and navigation
        .route("/api/toc", post(save_toc_handler))
        .route("/api/nav/:version", get(nav_handler))
        .route("/api/reload", post(reload_handler))
        // Resolution
        .route("/resolve", get(resolve_handler))
        .route("/Documentation/*rest", get(document_handler))
        // Health checks
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(state)
}

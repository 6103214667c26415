use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::error::SearchError;
use crate::llm::{GeminiDriver, LlmDriver};
use crate::search::{FollowUpOutcome, SearchOutcome};

/// Largest request body the API accepts.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let settings = config.llm_settings();
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        display_language = %settings.display_language,
        timeout_secs = settings.timeout.as_secs(),
        default_key = config.provider.api_key.is_some(),
        "LLM configuration loaded"
    );

    let driver: Arc<dyn LlmDriver> = Arc::new(GeminiDriver::new(settings));
    let state = AppState::new(Arc::clone(&config), driver);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router with all routes and layers applied.
pub fn build_router(state: AppState) -> Router {
    let timeout_duration = Duration::from_secs(state.config.server.request_timeout_secs);
    let cors = if state.config.server.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/api/search", get(api_search))
        .route("/api/follow-up", post(api_follow_up))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Query string for the search API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    /// Question to answer.
    #[serde(default)]
    q: Option<String>,
    /// Credential overriding the configured default.
    #[serde(default)]
    api_key: Option<String>,
}

/// GET /api/search - Answer a question in a new session.
async fn api_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchOutcome>, SearchError> {
    let Query(params) =
        params.map_err(|rejection| SearchError::Validation(rejection.body_text()))?;
    let query = params.q.unwrap_or_default();
    let outcome = state
        .search
        .start_search(&query, params.api_key.as_deref())
        .await?;
    Ok(Json(outcome))
}

/// Request body for the follow-up API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FollowUpRequest {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
}

/// POST /api/follow-up - Ask a question within an existing session.
async fn api_follow_up(
    State(state): State<AppState>,
    body: Result<Json<FollowUpRequest>, JsonRejection>,
) -> Result<Json<FollowUpOutcome>, SearchError> {
    let Json(req) = body.map_err(|rejection| SearchError::Validation(rejection.body_text()))?;
    let outcome = state
        .search
        .continue_follow_up(
            req.session_id.as_deref().unwrap_or_default(),
            req.query.as_deref().unwrap_or_default(),
            req.api_key.as_deref(),
        )
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    sessions: usize,
}

/// GET /health - Liveness probe.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.search.sessions().len().await,
    })
}

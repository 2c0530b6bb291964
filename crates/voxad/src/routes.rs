//! API routes for voxad

use crate::server::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use voxa_shared::rpc::{
    CommandRequest, HealthResponse, SuggestionsQuery, SuggestionsResponse, SummarizeRequest,
    SummarizeResponse, DEFAULT_SUGGESTIONS,
};
use voxa_shared::{CommandResponse, VERSION};

type AppStateArc = Arc<AppState>;

/// Upper bound on `?limit=` for suggestions
pub const MAX_SUGGESTIONS: usize = 20;

// ============================================================================
// Command Routes
// ============================================================================

pub fn command_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/command", post(handle_command))
        .route("/v1/summarize", post(summarize))
}

async fn handle_command(
    State(state): State<AppStateArc>,
    Json(req): Json<CommandRequest>,
) -> Json<CommandResponse> {
    let request_id = Uuid::new_v4();
    info!("[{}] command: {:?}", request_id, req.command);

    let response = state.router.classify(&req.command).await;
    info!(
        "[{}] replied ({} chars, action: {})",
        request_id,
        response.text.len(),
        response.action.is_some()
    );
    Json(response)
}

async fn summarize(
    State(state): State<AppStateArc>,
    Json(req): Json<SummarizeRequest>,
) -> Json<SummarizeResponse> {
    let summary = state.router.summarize(&req.command).await;
    Json(SummarizeResponse { summary })
}

// ============================================================================
// Personalization Routes
// ============================================================================

pub fn personalization_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/suggestions", get(suggestions))
}

async fn suggestions(
    State(state): State<AppStateArc>,
    Query(query): Query<SuggestionsQuery>,
) -> Json<SuggestionsResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_SUGGESTIONS).min(MAX_SUGGESTIONS);
    Json(SuggestionsResponse {
        suggestions: state.router.suggestions(limit).await,
    })
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

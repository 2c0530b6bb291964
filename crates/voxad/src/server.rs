//! HTTP server for voxad

use crate::router::IntentRouter;
use crate::routes;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Commands are single utterances; anything larger is rejected
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub router: IntentRouter,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(router: IntentRouter) -> Self {
        Self {
            router,
            start_time: Instant::now(),
        }
    }
}

/// Assemble every route with tracing attached
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::command_routes())
        .merge(routes::personalization_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(state: AppState, addr: &str) -> Result<()> {
    let app = app(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gracefully");
        })
        .await?;
    Ok(())
}

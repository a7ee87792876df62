pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Two-step flow: resolve entities, then analyze within the session
        .route("/api/v1/entities", post(handlers::handle_resolve_entities))
        .route("/api/v1/sessions/:id", get(handlers::handle_get_session))
        .route(
            "/api/v1/sessions/:id/analyze",
            post(handlers::handle_analyze_session),
        )
        // Single-step flow
        .route("/api/v1/analysis", post(handlers::handle_direct_analysis))
        .with_state(state)
}

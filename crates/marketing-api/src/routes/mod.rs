mod agents;
mod analyze;
mod health;
mod history;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use agents::agents_router;
use analyze::analyze_router;
use health::health_router;
use history::history_router;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health_router())
        .merge(analyze_router())
        .nest("/agents", agents_router())
        .nest("/history", history_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

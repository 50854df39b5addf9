use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::{AppState, CapacityReport};

const SERVICE_NAME: &str = "Marketing Agent API";
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    version: &'static str,
    health: &'static str,
    agents: &'static str,
}

#[derive(Serialize)]
struct HistoryUsage {
    entries: usize,
    capacity: usize,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    version: &'static str,
    capacity: CapacityReport,
    history: HistoryUsage,
}

pub fn health_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: SERVICE_NAME,
        version: VERSION,
        health: "/health",
        agents: "/agents",
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: VERSION,
        capacity: state.capacity(),
        history: HistoryUsage {
            entries: state.history().len().await,
            capacity: state.history().capacity(),
        },
    })
}

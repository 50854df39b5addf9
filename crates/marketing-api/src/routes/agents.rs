use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use marketing_core::{AgentDescriptor, AgentKind, agent_catalog};
use serde::Serialize;

use super::analyze::{AnalyzeRequest, run_analysis};
use crate::error::{ApiError, ApiResult};
use crate::history::AnalysisRecord;
use crate::state::AppState;

#[derive(Serialize)]
struct CatalogResponse {
    agents: Vec<AgentDescriptor>,
}

pub fn agents_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_agents))
        .route("/:name", post(run_agent))
}

async fn list_agents() -> Json<CatalogResponse> {
    Json(CatalogResponse {
        agents: agent_catalog(),
    })
}

/// Run one named agent, bypassing the supervisor.
async fn run_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalysisRecord>> {
    let kind = name.parse::<AgentKind>().map_err(ApiError::from)?;
    let record = run_analysis(&state, request.query, vec![kind]).await?;
    Ok(Json(record))
}

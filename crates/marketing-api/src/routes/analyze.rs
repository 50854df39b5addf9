use axum::{Json, Router, extract::State, routing::post};
use marketing_core::{AgentKind, RunOptions, new_request_id};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::history::AnalysisRecord;
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
    #[serde(default)]
    pub specific_agents: Option<Vec<AgentKind>>,
}

pub fn analyze_router() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalysisRecord>> {
    let agents = request.specific_agents.unwrap_or_default();
    let record = run_analysis(&state, request.query, agents).await?;
    Ok(Json(record))
}

/// Run one analysis and record it in history on success.
pub(super) async fn run_analysis(
    state: &AppState,
    query: String,
    agents: Vec<AgentKind>,
) -> ApiResult<AnalysisRecord> {
    let request_id = new_request_id();
    let _permit = state
        .acquire_permit()
        .map_err(|err| err.with_request_id(request_id.clone()))?;

    metrics::analysis_started(&request_id, agents.len(), state.capacity().available);
    let preview = query.chars().take(100).collect::<String>();
    info!(request_id = %request_id, query = %preview, "processing analysis");

    let options = RunOptions::new(&query)
        .with_agents(agents)
        .with_request_id(request_id.clone());

    match state.orchestrator().run_with_options(options).await {
        Ok(outcome) => {
            let record = AnalysisRecord::from_outcome(&outcome);
            state.history().push(record.clone()).await;
            metrics::analysis_completed(
                &record.request_id,
                record.selected_agents.len(),
                record.processing_time_seconds,
                state.history().len().await,
            );
            Ok(record)
        }
        Err(err) => {
            let error = ApiError::from(err).with_request_id(request_id.clone());
            warn!(request_id = %request_id, error = %error, "analysis failed");
            metrics::analysis_failed(&request_id, error.status().as_u16(), &error.to_string());
            Err(error)
        }
    }
}

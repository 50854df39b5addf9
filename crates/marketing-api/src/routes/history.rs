use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use marketing_core::MarketingError;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::history::AnalysisRecord;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HistoryResponse {
    total_requests: usize,
    recent_requests: Vec<AnalysisRecord>,
}

pub fn history_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_history))
        .route("/:id", get(get_record))
}

async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Json(HistoryResponse {
        total_requests: state.history().len().await,
        recent_requests: state.history().recent(limit).await,
    })
}

async fn get_record(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<AnalysisRecord>> {
    state
        .history()
        .get(&request_id)
        .await
        .map(Json)
        .ok_or_else(|| {
            ApiError::from(MarketingError::NotFound(format!("request {request_id}")))
        })
}

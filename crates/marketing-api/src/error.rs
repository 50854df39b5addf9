use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use marketing_core::MarketingError;
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    request_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            request_id: None,
        }
    }

    pub fn internal(error: impl ToString) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<MarketingError> for ApiError {
    fn from(error: MarketingError) -> Self {
        let status = match &error {
            MarketingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            MarketingError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketingError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, error.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let payload = ErrorResponse {
            success: false,
            error: self.message,
            request_id: self.request_id,
            timestamp: Utc::now(),
        };
        (self.status, Json(payload)).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    timestamp: DateTime<Utc>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (
                MarketingError::Validation("too short".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                MarketingError::NotFound("abc".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                MarketingError::Timeout { after_ms: 10 },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                MarketingError::search("search service returned status 502"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status(), status);
        }
    }
}

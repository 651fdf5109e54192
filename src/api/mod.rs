//! REST API endpoints.
//!
//! Axum-based HTTP API serving the combined and per-faction ladder views,
//! player profiles, and service status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::fetch::FetchError;
use crate::service::ServiceError;

pub mod routes;
pub mod state;

use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::UnknownBoard(id) => {
                ApiError::NotFound(format!("leaderboard {}", id))
            }
            ServiceError::Fetch(FetchError::ProfileNotFound(id)) => {
                ApiError::NotFound(format!("profile {}", id))
            }
            ServiceError::Fetch(e) => ApiError::Upstream(e.to_string()),
            ServiceError::Storage(e) => ApiError::Internal(e.to_string()),
            ServiceError::Degraded { mode } => {
                ApiError::Upstream(format!("all source boards failed for {}", mode))
            }
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::status::health))
        .route("/api/status", get(routes::status::status))
        .route("/api/leaderboards", get(routes::leaderboards::list))
        .route(
            "/api/leaderboards/combined/:match_type",
            get(routes::leaderboards::combined),
        )
        .route("/api/leaderboards/:id", get(routes::leaderboards::board))
        .route("/api/players/:profile_id", get(routes::players::player))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        let resp = ApiError::NotFound("x".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = ApiError::BadRequest("x".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError::Upstream("x".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let resp = ApiError::Internal("x".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_service_error_mapping() {
        let api: ApiError = ServiceError::UnknownBoard(9).into();
        assert!(matches!(api, ApiError::NotFound(_)));

        let api: ApiError = ServiceError::Fetch(FetchError::ProfileNotFound("1".to_string())).into();
        assert!(matches!(api, ApiError::NotFound(_)));

        let api: ApiError = ServiceError::Fetch(FetchError::HttpStatus {
            status: 500,
            message: "boom".to_string(),
        })
        .into();
        assert!(matches!(api, ApiError::Upstream(_)));
    }
}

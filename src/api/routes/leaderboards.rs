use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::{MatchType, LEADERBOARDS};
use crate::service::{LadderView, ViewKey};

#[derive(Debug, Serialize)]
pub struct BoardsResponse {
    pub leaderboards: Vec<LeaderboardDef>,
}

/// The static board registry.
pub async fn list() -> Json<BoardsResponse> {
    Json(BoardsResponse {
        leaderboards: LEADERBOARDS.to_vec(),
    })
}

/// A degraded view keeps the response shape but signals "no data" with
/// `stale: true` and a gateway error status.
fn view_response(view: LadderView) -> Response {
    let status = if view.stale {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    (status, Json(view)).into_response()
}

/// Live view of a single per-faction board.
pub async fn board(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Response, ApiError> {
    let view = state.service.view(&ViewKey::Board(id)).await?;
    Ok(view_response(view))
}

/// Cross-faction combined view for one match type.
pub async fn combined(
    State(state): State<AppState>,
    Path(match_type): Path<String>,
) -> Result<Response, ApiError> {
    let mt: MatchType = match_type.parse().map_err(ApiError::BadRequest)?;
    let view = state.service.view(&ViewKey::Combined(mt)).await?;
    Ok(view_response(view))
}

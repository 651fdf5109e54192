use axum::extract::{Path, State};
use axum::Json;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::PlayerProfile;

/// One player's profile and per-board standings.
pub async fn player(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
) -> Result<Json<PlayerProfile>, ApiError> {
    if profile_id.trim().is_empty() || !profile_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::BadRequest(format!(
            "invalid profile id: {}",
            profile_id
        )));
    }

    let profile = state.service.player(&profile_id).await?;
    Ok(Json(profile))
}

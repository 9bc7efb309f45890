//! Presence reporting for clients without a live socket.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use herald_core::types::id::UserId;

use crate::dto::PresenceRequest;
use crate::error::ApiResult;
use crate::state::AppState;

/// PUT /api/presence/{user_id}
pub async fn set_presence(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(req): Json<PresenceRequest>,
) -> ApiResult<StatusCode> {
    state
        .notifications
        .set_active_context(user_id, req.context)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

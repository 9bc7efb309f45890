//! Device token registration.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use validator::Validate;

use crate::dto::{ApiResponse, PushTargetRemoved, PushTargetRequest};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/push-targets
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<PushTargetRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;
    state.notifications.register_push_target(req.into()).await?;
    Ok(StatusCode::CREATED)
}

/// DELETE /api/push-targets
///
/// Also cancels outstanding retries for the token.
pub async fn unregister(
    State(state): State<AppState>,
    Json(req): Json<PushTargetRequest>,
) -> ApiResult<Json<ApiResponse<PushTargetRemoved>>> {
    req.validate()?;
    let removed = state
        .notifications
        .unregister_push_target(&req.into())
        .await?;
    Ok(Json(ApiResponse::ok(PushTargetRemoved { removed })))
}

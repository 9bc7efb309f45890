//! Event intake: controllers post interactions here after persisting them.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use herald_core::error::AppError;
use herald_core::events::NotificationEvent;

use crate::dto::{ApiResponse, EventAccepted};
use crate::error::ApiResult;
use crate::state::AppState;

/// POST /api/events
///
/// Accepts the event and returns at once; delivery runs in the background.
pub async fn submit_event(
    State(state): State<AppState>,
    Json(event): Json<NotificationEvent>,
) -> ApiResult<(StatusCode, Json<ApiResponse<EventAccepted>>)> {
    if event.actor.name.trim().is_empty() {
        return Err(AppError::validation("Actor name is required").into());
    }
    let event_id = event.id;
    state.notifications.notify(event);
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::ok(EventAccepted { event_id })),
    ))
}

//! Health check handler.

use axum::Json;
use axum::extract::State;

use herald_core::traits::cache::CacheProvider;

use crate::dto::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let cache = match state.cache.health_check().await {
        Ok(true) => "connected",
        Ok(false) | Err(_) => "unavailable",
    };
    let connections = &state.realtime.connections;

    Json(ApiResponse::ok(HealthResponse {
        status: if cache == "connected" { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache: cache.to_string(),
        connections: connections.connection_count(),
        online_users: connections.user_count(),
    }))
}

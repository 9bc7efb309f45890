//! Request and response DTOs.

use serde::{Deserialize, Serialize};
use validator::Validate;

use herald_core::types::id::{EventId, UserId};
use herald_core::types::presence::ActiveContext;
use herald_core::types::push::{Platform, PushTarget};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Push target registration (and removal) body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PushTargetRequest {
    /// Owner of the device.
    pub user_id: UserId,
    /// Provider device token.
    #[validate(length(min = 1, max = 4096, message = "Token must be 1-4096 characters"))]
    pub token: String,
    /// Device platform.
    pub platform: Platform,
}

impl From<PushTargetRequest> for PushTarget {
    fn from(req: PushTargetRequest) -> Self {
        PushTarget::new(req.user_id, req.token, req.platform)
    }
}

/// Active context report. `null` clears it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceRequest {
    /// The screen now in front.
    #[serde(default)]
    pub context: Option<ActiveContext>,
}

/// Event intake acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAccepted {
    /// ID of the accepted event.
    pub event_id: EventId,
}

/// Push target removal result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushTargetRemoved {
    /// Whether the target was registered.
    pub removed: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Cache status.
    pub cache: String,
    /// Live socket sessions.
    pub connections: usize,
    /// Users with at least one live session.
    pub online_users: usize,
}

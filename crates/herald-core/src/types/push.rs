//! Push targets (device registrations) and provider-level push types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Device platform of a push target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Android device (FCM native).
    Android,
    /// iOS device (FCM via APNs).
    Ios,
    /// Browser (web push via FCM).
    Web,
}

impl Platform {
    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Web => "web",
        }
    }
}

/// A device-specific token the push provider uses to address a
/// notification. A user owns one target per registered device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PushTarget {
    /// Owning user.
    pub user_id: UserId,
    /// Provider registration token.
    pub token: String,
    /// Device platform.
    pub platform: Platform,
}

impl PushTarget {
    /// Create a new push target.
    pub fn new(user_id: UserId, token: impl Into<String>, platform: Platform) -> Self {
        Self {
            user_id,
            token: token.into(),
            platform,
        }
    }
}

/// Provider payload for one notification.
///
/// `data` values are strings because FCM only accepts string maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    /// Banner title.
    pub title: String,
    /// Banner body.
    pub body: String,
    /// Data payload delivered to the app.
    pub data: HashMap<String, String>,
}

/// Provider error code for a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushErrorCode {
    /// The token is no longer registered (app uninstalled, token rotated).
    Unregistered,
    /// The token is malformed or otherwise invalid.
    InvalidArgument,
    /// The token belongs to a different sender.
    SenderIdMismatch,
    /// The server's credentials lack permission to send. A configuration
    /// problem on our side, not a dead token.
    PermissionDenied,
    /// Provider rate limit hit.
    QuotaExceeded,
    /// Provider temporarily unavailable.
    Unavailable,
    /// Provider internal error.
    Internal,
    /// Anything else, including transport failures.
    Unknown,
}

impl PushErrorCode {
    /// Whether the token itself is dead. Permanent failures prune the
    /// target and are never retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Unregistered | Self::InvalidArgument | Self::SenderIdMismatch
        )
    }

    /// Parse an FCM v1 `errorCode` detail.
    pub fn from_fcm(code: &str) -> Self {
        match code {
            "UNREGISTERED" => Self::Unregistered,
            "INVALID_ARGUMENT" => Self::InvalidArgument,
            "SENDER_ID_MISMATCH" => Self::SenderIdMismatch,
            "THIRD_PARTY_AUTH_ERROR" => Self::PermissionDenied,
            "QUOTA_EXCEEDED" => Self::QuotaExceeded,
            "UNAVAILABLE" => Self::Unavailable,
            "INTERNAL" => Self::Internal,
            _ => Self::Unknown,
        }
    }

    /// Parse the gRPC `status` of an FCM error without an `errorCode`
    /// detail. Never yields [`Self::SenderIdMismatch`]: a bare
    /// `PERMISSION_DENIED` concerns the caller's credentials, not the token.
    pub fn from_fcm_status(status: &str) -> Self {
        match status {
            "NOT_FOUND" => Self::Unregistered,
            "INVALID_ARGUMENT" => Self::InvalidArgument,
            "PERMISSION_DENIED" | "UNAUTHENTICATED" => Self::PermissionDenied,
            "RESOURCE_EXHAUSTED" => Self::QuotaExceeded,
            "UNAVAILABLE" => Self::Unavailable,
            "INTERNAL" => Self::Internal,
            _ => Self::Unknown,
        }
    }

    /// Converts to string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unregistered => "unregistered",
            Self::InvalidArgument => "invalid_argument",
            Self::SenderIdMismatch => "sender_id_mismatch",
            Self::PermissionDenied => "permission_denied",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
            Self::Unknown => "unknown",
        }
    }
}

/// Result for one token of a multicast send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResponse {
    /// The addressed token.
    pub token: String,
    /// Provider message ID on success.
    pub result: Result<String, PushErrorCode>,
}

/// Aggregated result of a multicast send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MulticastResponse {
    /// Number of tokens that accepted the message.
    pub success_count: usize,
    /// Number of tokens that rejected the message.
    pub failure_count: usize,
    /// Per-token results, in request order.
    pub responses: Vec<SendResponse>,
}

impl MulticastResponse {
    /// Build a response from per-token results, computing the counters.
    pub fn from_responses(responses: Vec<SendResponse>) -> Self {
        let success_count = responses.iter().filter(|r| r.result.is_ok()).count();
        Self {
            success_count,
            failure_count: responses.len() - success_count,
            responses,
        }
    }

    /// Result for a given token, if the provider reported one.
    pub fn result_for(&self, token: &str) -> Option<&Result<String, PushErrorCode>> {
        self.responses
            .iter()
            .find(|r| r.token == token)
            .map(|r| &r.result)
    }
}

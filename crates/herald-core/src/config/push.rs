//! Push provider configuration.

use serde::{Deserialize, Serialize};

/// Push delivery provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Provider type: `"fcm"` (Firebase Cloud Messaging) or `"log"`
    /// (log-only, for local development).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Per-request timeout for provider calls in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Firebase Cloud Messaging settings.
    #[serde(default)]
    pub fcm: FcmConfig,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            request_timeout_seconds: default_request_timeout(),
            fcm: FcmConfig::default(),
        }
    }
}

/// Firebase Cloud Messaging (HTTP v1) settings.
///
/// Credentials come either from `credentials_file` (a service-account JSON
/// key) or from the inline `client_email` / `private_key` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmConfig {
    /// Firebase project ID.
    #[serde(default)]
    pub project_id: String,
    /// Path to a service-account JSON key file.
    #[serde(default)]
    pub credentials_file: Option<String>,
    /// Service-account client email.
    #[serde(default)]
    pub client_email: String,
    /// Service-account RSA private key (PEM).
    #[serde(default)]
    pub private_key: String,
    /// OAuth2 token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// FCM API base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            credentials_file: None,
            client_email: String::new(),
            private_key: String::new(),
            token_uri: default_token_uri(),
            endpoint: default_endpoint(),
        }
    }
}

fn default_provider() -> String {
    "log".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_endpoint() -> String {
    "https://fcm.googleapis.com".to_string()
}

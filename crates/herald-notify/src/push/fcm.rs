//! Firebase Cloud Messaging (HTTP v1) push provider.
//!
//! FCM v1 accepts one token per request, so a multicast is fanned out as
//! concurrent `messages:send` calls. Requests are authorized with an OAuth2
//! access token minted from the service-account key (JWT bearer grant) and
//! cached until shortly before it expires.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use herald_core::config::PushConfig;
use herald_core::error::{AppError, ErrorKind};
use herald_core::result::AppResult;
use herald_core::traits::push::PushProvider;
use herald_core::types::push::{MulticastResponse, PushErrorCode, PushMessage, SendResponse};

/// OAuth2 scope for sending messages.
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// `grant_type` for the JWT bearer flow, form-encoded.
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for minted assertions, in seconds.
const ASSERTION_TTL_SECS: i64 = 3600;

/// Refresh the access token this long before it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Service-account key fields used by the provider.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccount {
    #[serde(default)]
    project_id: String,
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

/// JWT claims of the token-exchange assertion.
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_TTL_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// FCM error body: `{"error": {"code", "status", "details": [{"errorCode"}]}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendSuccess {
    name: String,
}

/// FCM HTTP v1 provider.
pub struct FcmPushProvider {
    client: reqwest::Client,
    project_id: String,
    client_email: String,
    token_uri: String,
    send_url: String,
    encoding_key: EncodingKey,
    token: RwLock<Option<CachedToken>>,
}

impl std::fmt::Debug for FcmPushProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FcmPushProvider")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .finish()
    }
}

impl FcmPushProvider {
    /// Create the provider from configuration. Credentials come from
    /// `fcm.credentials_file` when set, otherwise from the inline fields.
    pub fn new(config: &PushConfig) -> AppResult<Self> {
        let fcm = &config.fcm;
        let mut account = match &fcm.credentials_file {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Configuration,
                        format!("Cannot read FCM credentials file '{path}'"),
                        e,
                    )
                })?;
                serde_json::from_str::<ServiceAccount>(&raw).map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Configuration,
                        "Invalid FCM credentials file",
                        e,
                    )
                })?
            }
            None => ServiceAccount {
                project_id: fcm.project_id.clone(),
                client_email: fcm.client_email.clone(),
                private_key: fcm.private_key.clone(),
                token_uri: None,
            },
        };
        if !fcm.project_id.is_empty() {
            account.project_id = fcm.project_id.clone();
        }
        if account.project_id.is_empty()
            || account.client_email.is_empty()
            || account.private_key.is_empty()
        {
            return Err(AppError::configuration(
                "FCM requires project_id, client_email and private_key",
            ));
        }

        let encoding_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes()).map_err(
            |e| AppError::with_source(ErrorKind::Configuration, "Invalid FCM private key", e),
        )?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(1)))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Cannot build HTTP client", e)
            })?;

        Ok(Self {
            client,
            send_url: format!(
                "{}/v1/projects/{}/messages:send",
                fcm.endpoint.trim_end_matches('/'),
                account.project_id
            ),
            project_id: account.project_id,
            client_email: account.client_email,
            token_uri: account.token_uri.unwrap_or_else(|| fcm.token_uri.clone()),
            encoding_key,
            token: RwLock::new(None),
        })
    }

    /// A valid access token, minting a new one when the cached one is about
    /// to expire.
    async fn access_token(&self) -> AppResult<String> {
        let now = Utc::now();
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.expires_at > now {
                return Ok(cached.value.clone());
            }
        }

        let mut slot = self.token.write().await;
        if let Some(cached) = slot.as_ref() {
            if cached.expires_at > now {
                return Ok(cached.value.clone());
            }
        }

        let fresh = self.mint_token().await?;
        let value = fresh.value.clone();
        *slot = Some(fresh);
        Ok(value)
    }

    async fn mint_token(&self) -> AppResult<CachedToken> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: FCM_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_TTL_SECS,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "Cannot sign FCM assertion", e)
            })?;

        let response = self
            .client
            .post(&self.token_uri)
            .form(&token_request_form(&assertion))
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::ExternalService, "OAuth2 token request failed", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::external(format!(
                "OAuth2 token request rejected ({status}): {body}"
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AppError::with_source(ErrorKind::ExternalService, "Invalid OAuth2 token response", e)
        })?;

        debug!(expires_in = token.expires_in, "Minted FCM access token");

        Ok(CachedToken {
            value: token.access_token,
            expires_at: Utc::now()
                + chrono::Duration::seconds(token.expires_in - TOKEN_REFRESH_MARGIN_SECS),
        })
    }

    async fn send_one(
        &self,
        access_token: &str,
        token: &str,
        message: &PushMessage,
    ) -> Result<String, PushErrorCode> {
        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&request_body(token, message))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "FCM request failed");
                PushErrorCode::Unknown
            })?;

        let status = response.status();
        if status.is_success() {
            return match response.json::<SendSuccess>().await {
                Ok(ok) => Ok(ok.name),
                Err(_) => Ok(String::new()),
            };
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.token.write().await.take();
        }
        let body = response.text().await.unwrap_or_default();
        let code = map_error(status.as_u16(), &body);
        debug!(status = status.as_u16(), code = code.as_str(), "FCM rejected token");
        Err(code)
    }
}

#[async_trait]
impl PushProvider for FcmPushProvider {
    fn provider_type(&self) -> &str {
        "fcm"
    }

    async fn multicast_send(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> AppResult<MulticastResponse> {
        if tokens.is_empty() {
            return Ok(MulticastResponse::default());
        }
        let access_token = self.access_token().await?;

        let results = join_all(
            tokens
                .iter()
                .map(|token| self.send_one(&access_token, token, message)),
        )
        .await;

        Ok(MulticastResponse::from_responses(
            tokens
                .iter()
                .zip(results)
                .map(|(token, result)| SendResponse {
                    token: token.clone(),
                    result,
                })
                .collect(),
        ))
    }
}

/// `messages:send` request body for one token.
fn request_body(token: &str, message: &PushMessage) -> serde_json::Value {
    serde_json::json!({
        "message": {
            "token": token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
            "android": { "priority": "high" },
            "apns": { "payload": { "aps": { "sound": "default" } } },
        }
    })
}

/// Map an FCM error response to a per-token code.
///
/// The `errorCode` detail wins over the gRPC status; without either, the
/// HTTP status decides (404 means the token is gone).
/// Fields of the OAuth2 JWT-bearer token request.
fn token_request_form(assertion: &str) -> [(&'static str, &str); 2] {
    [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)]
}

fn map_error(status: u16, body: &str) -> PushErrorCode {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if let Some(code) = envelope
            .error
            .details
            .iter()
            .find_map(|d| d.error_code.as_deref())
        {
            return PushErrorCode::from_fcm(code);
        }
        if let Some(code) = envelope.error.status.as_deref() {
            let mapped = PushErrorCode::from_fcm_status(code);
            if mapped != PushErrorCode::Unknown {
                return mapped;
            }
        }
    }
    match status {
        404 => PushErrorCode::Unregistered,
        400 => PushErrorCode::InvalidArgument,
        401 | 403 => PushErrorCode::PermissionDenied,
        429 => PushErrorCode::QuotaExceeded,
        503 => PushErrorCode::Unavailable,
        500 => PushErrorCode::Internal,
        _ => PushErrorCode::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_error_code_detail_wins() {
        let body = r#"{"error":{"code":404,"status":"NOT_FOUND","details":[
            {"@type":"type.googleapis.com/google.firebase.fcm.v1.FcmError","errorCode":"UNREGISTERED"}]}}"#;
        assert_eq!(map_error(404, body), PushErrorCode::Unregistered);

        let body = r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED","details":[
            {"errorCode":"QUOTA_EXCEEDED"}]}}"#;
        assert_eq!(map_error(429, body), PushErrorCode::QuotaExceeded);
    }

    #[test]
    fn test_token_request_uses_jwt_bearer_grant() {
        let form = token_request_form("a.b.c");
        assert_eq!(form[0], ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"));
        assert_eq!(form[1], ("assertion", "a.b.c"));
    }

    #[test]
    fn test_permission_denied_does_not_prune() {
        let body = r#"{"error":{"code":403,"status":"PERMISSION_DENIED",
            "message":"Permission 'cloudmessaging.messages.create' denied"}}"#;
        let code = map_error(403, body);
        assert_eq!(code, PushErrorCode::PermissionDenied);
        assert!(!code.is_permanent());

        assert_eq!(map_error(403, ""), PushErrorCode::PermissionDenied);
        assert!(!map_error(403, "").is_permanent());
    }

    #[test]
    fn test_sender_mismatch_detail_is_permanent() {
        let body = r#"{"error":{"code":403,"status":"PERMISSION_DENIED","details":[
            {"errorCode":"SENDER_ID_MISMATCH"}]}}"#;
        let code = map_error(403, body);
        assert_eq!(code, PushErrorCode::SenderIdMismatch);
        assert!(code.is_permanent());
    }

    #[test]
    fn test_status_fallbacks() {
        assert_eq!(map_error(404, ""), PushErrorCode::Unregistered);
        assert_eq!(map_error(503, "oops"), PushErrorCode::Unavailable);
        assert_eq!(
            map_error(400, r#"{"error":{"status":"INVALID_ARGUMENT"}}"#),
            PushErrorCode::InvalidArgument
        );
        assert_eq!(map_error(502, ""), PushErrorCode::Unknown);
    }

    #[test]
    fn test_request_body_shape() {
        let mut data = HashMap::new();
        data.insert("type".to_string(), "message".to_string());
        let msg = PushMessage {
            title: "Ann".to_string(),
            body: "hi".to_string(),
            data,
        };
        let body = request_body("tok", &msg);
        assert_eq!(body["message"]["token"], "tok");
        assert_eq!(body["message"]["notification"]["title"], "Ann");
        assert_eq!(body["message"]["data"]["type"], "message");
    }

    #[test]
    fn test_missing_credentials_file_is_configuration_error() {
        let mut config = PushConfig::default();
        config.provider = "fcm".to_string();
        config.fcm.credentials_file = Some("/nonexistent/herald-fcm.json".to_string());
        let err = FcmPushProvider::new(&config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}

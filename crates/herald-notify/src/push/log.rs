//! Push provider that only logs. Used in development.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use herald_core::result::AppResult;
use herald_core::traits::push::PushProvider;
use herald_core::types::push::{MulticastResponse, PushMessage, SendResponse};

/// Accepts every token and logs the message.
#[derive(Debug, Default)]
pub struct LogPushProvider;

impl LogPushProvider {
    /// Create the provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PushProvider for LogPushProvider {
    fn provider_type(&self) -> &str {
        "log"
    }

    async fn multicast_send(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> AppResult<MulticastResponse> {
        info!(
            tokens = tokens.len(),
            title = %message.title,
            body = %message.body,
            kind = message.data.get("type").map(String::as_str).unwrap_or(""),
            "Push (log provider)"
        );
        Ok(MulticastResponse::from_responses(
            tokens
                .iter()
                .map(|token| SendResponse {
                    token: token.clone(),
                    result: Ok(format!("log/{}", Uuid::new_v4())),
                })
                .collect(),
        ))
    }
}

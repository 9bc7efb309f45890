//! Push provider trait.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::push::{MulticastResponse, PushMessage};

/// A messaging provider able to deliver one message to many device tokens.
///
/// A returned `Err` means the call as a whole failed (transport, auth);
/// per-token rejections are reported inside [`MulticastResponse`].
#[async_trait]
pub trait PushProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Provider name for logging.
    fn provider_type(&self) -> &str;

    /// Send `message` to every token.
    async fn multicast_send(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> AppResult<MulticastResponse>;
}

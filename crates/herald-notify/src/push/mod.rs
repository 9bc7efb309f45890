//! Push provider implementations and selection.

pub mod fcm;
pub mod log;

use std::sync::Arc;

use tracing::info;

use herald_core::config::PushConfig;
use herald_core::error::AppError;
use herald_core::result::AppResult;
use herald_core::traits::push::PushProvider;

pub use fcm::FcmPushProvider;
pub use log::LogPushProvider;

/// Build the push provider named by `config.provider`.
pub fn build_push_provider(config: &PushConfig) -> AppResult<Arc<dyn PushProvider>> {
    match config.provider.as_str() {
        "fcm" => {
            info!("Initializing FCM push provider");
            Ok(Arc::new(FcmPushProvider::new(config)?))
        }
        "log" => {
            info!("Initializing logging push provider");
            Ok(Arc::new(LogPushProvider::new()))
        }
        other => Err(AppError::configuration(format!(
            "Unknown push provider: '{other}'. Supported: fcm, log"
        ))),
    }
}

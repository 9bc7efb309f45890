//! Core type definitions used across the Herald workspace.

pub mod delivery;
pub mod id;
pub mod preferences;
pub mod presence;
pub mod push;

pub use delivery::{AttemptOutcome, Channel, DecisionReason, DeliveryAttempt, RecipientDecision};
pub use id::*;
pub use preferences::NotificationPreferences;
pub use presence::ActiveContext;
pub use push::{MulticastResponse, Platform, PushErrorCode, PushMessage, PushTarget, SendResponse};

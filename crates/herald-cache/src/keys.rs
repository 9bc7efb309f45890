//! Cache key builders for all Herald cache entries.

use herald_core::types::id::UserId;

/// Prefix applied to all Herald cache keys.
const PREFIX: &str = "herald";

/// Cache key for a user's active in-app context.
pub fn presence_context(user_id: UserId) -> String {
    format!("{PREFIX}:presence:{user_id}")
}

//! Per-user notification preferences.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::events::EventKind;

/// Notification preferences for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Event kinds the user does not want to be notified about.
    #[serde(default)]
    pub muted_kinds: HashSet<EventKind>,
}

impl NotificationPreferences {
    /// Whether notifications of `kind` are muted.
    pub fn is_muted(&self, kind: EventKind) -> bool {
        self.muted_kinds.contains(&kind)
    }
}

//! Records owned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use oncall_core::{HolderKey, NotifyPreference};

/// Setting key holding the channel used for mentions and announcements.
pub const PING_CHANNEL_ID: &str = "ping_channel_id";
/// Setting key holding the base-timezone date (`YYYY-MM-DD`) of the last heads-up.
pub const WEEKLY_HEADSUP_LAST_DATE: &str = "weekly_headsup_last_date";

/// A holder bound to a person on the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub holder: HolderKey,
    /// Chat-platform user id.
    pub external_id: String,
    /// IANA zone used to render times for this person.
    pub timezone: String,
    #[serde(default)]
    pub notify_preference: NotifyPreference,
}

impl RosterEntry {
    pub fn new(
        holder: HolderKey,
        external_id: impl Into<String>,
        timezone: impl Into<String>,
    ) -> Self {
        Self {
            holder,
            external_id: external_id.into(),
            timezone: timezone.into(),
            notify_preference: NotifyPreference::default(),
        }
    }

    pub fn with_preference(mut self, preference: NotifyPreference) -> Self {
        self.notify_preference = preference;
        self
    }
}

/// Notification progress for the holder's current shift occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCursor {
    pub holder: HolderKey,
    pub last_notified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shift_started: bool,
}

impl NotificationCursor {
    pub fn empty(holder: HolderKey) -> Self {
        Self {
            holder,
            last_notified_at: None,
            shift_started: false,
        }
    }

    /// Whether anything has been recorded since the last reset.
    pub fn has_activity(&self) -> bool {
        self.shift_started || self.last_notified_at.is_some()
    }
}

//! Roster, notification cursor and settings storage.
//!
//! The notification engine only sees the capability traits below; the two
//! implementations here are a process-local [`MemoryStore`] and a
//! [`JsonFileStore`] that keeps everything in a single JSON document.

pub mod error;
pub mod file;
pub mod memory;
pub mod model;
pub mod state;

use chrono::{DateTime, Utc};

use oncall_core::{HolderKey, NotifyPreference};

pub use error::{Result, StoreError};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use model::{NotificationCursor, RosterEntry, PING_CHANNEL_ID, WEEKLY_HEADSUP_LAST_DATE};
pub use state::{StateAccess, StoreState};

pub trait RosterStore: Send + Sync {
    fn list_roster_entries(&self) -> Result<Vec<RosterEntry>>;
    fn get_roster_entry(&self, holder: &HolderKey) -> Result<Option<RosterEntry>>;
    fn get_roster_entry_by_external_id(&self, external_id: &str) -> Result<Option<RosterEntry>>;
    /// Insert or replace the entry for `entry.holder`. Creates an empty cursor.
    fn upsert_roster_entry(&self, entry: RosterEntry) -> Result<()>;
    /// Remove the entry and its cursor. Returns `false` if it did not exist.
    fn remove_roster_entry(&self, holder: &HolderKey) -> Result<bool>;
    fn set_notify_preference(&self, holder: &HolderKey, preference: NotifyPreference) -> Result<()>;
}

pub trait CursorStore: Send + Sync {
    fn get_cursor(&self, holder: &HolderKey) -> Result<Option<NotificationCursor>>;
    fn set_shift_started(&self, holder: &HolderKey, started: bool) -> Result<()>;
    fn set_last_notified_at(&self, holder: &HolderKey, at: DateTime<Utc>) -> Result<()>;
    fn reset_cursor(&self, holder: &HolderKey) -> Result<()>;
}

pub trait SettingsStore: Send + Sync {
    fn get_setting(&self, key: &str) -> Result<Option<String>>;
    fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}

/// Everything the notification engine needs from storage.
pub trait Store: RosterStore + CursorStore + SettingsStore {}

impl<T: RosterStore + CursorStore + SettingsStore + ?Sized> Store for T {}

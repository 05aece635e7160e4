//! The whole store as one serializable document.
//!
//! [`MemoryStore`](crate::MemoryStore) and [`JsonFileStore`](crate::JsonFileStore)
//! both keep a [`StoreState`] behind a lock; they differ only in whether a
//! write is followed by a flush to disk.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use oncall_core::{HolderKey, NotifyPreference};

use crate::error::{Result, StoreError};
use crate::model::{NotificationCursor, RosterEntry};
use crate::{CursorStore, RosterStore, SettingsStore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub roster: BTreeMap<HolderKey, RosterEntry>,
    #[serde(default)]
    pub cursors: BTreeMap<HolderKey, NotificationCursor>,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl StoreState {
    fn upsert_roster_entry(&mut self, entry: RosterEntry) -> Result<()> {
        if let Some(other) = self
            .roster
            .values()
            .find(|e| e.external_id == entry.external_id && e.holder != entry.holder)
        {
            return Err(StoreError::DuplicateExternalId {
                external_id: entry.external_id,
                holder: other.holder.clone(),
            });
        }
        let holder = entry.holder.clone();
        self.cursors
            .entry(holder.clone())
            .or_insert_with(|| NotificationCursor::empty(holder.clone()));
        info!(
            holder = %holder,
            external_id = %entry.external_id,
            timezone = %entry.timezone,
            "roster entry saved"
        );
        self.roster.insert(holder, entry);
        Ok(())
    }

    fn remove_roster_entry(&mut self, holder: &HolderKey) -> bool {
        self.cursors.remove(holder);
        let removed = self.roster.remove(holder).is_some();
        if removed {
            info!(holder = %holder, "roster entry removed");
        }
        removed
    }

    fn set_notify_preference(
        &mut self,
        holder: &HolderKey,
        preference: NotifyPreference,
    ) -> Result<()> {
        let entry = self
            .roster
            .get_mut(holder)
            .ok_or_else(|| StoreError::NotFound(holder.clone()))?;
        entry.notify_preference = preference;
        info!(holder = %holder, preference = %preference, "notify preference updated");
        Ok(())
    }

    fn cursor_mut(&mut self, holder: &HolderKey) -> &mut NotificationCursor {
        self.cursors
            .entry(holder.clone())
            .or_insert_with(|| NotificationCursor::empty(holder.clone()))
    }
}

/// Locked access to a [`StoreState`].
///
/// Implementors get [`RosterStore`], [`CursorStore`] and [`SettingsStore`]
/// for free.
pub trait StateAccess: Send + Sync {
    fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> Result<R>;

    /// Apply `f`; implementations persist the state when `f` succeeds.
    fn write<R>(&self, f: impl FnOnce(&mut StoreState) -> Result<R>) -> Result<R>;
}

impl<T: StateAccess> RosterStore for T {
    fn list_roster_entries(&self) -> Result<Vec<RosterEntry>> {
        self.read(|s| s.roster.values().cloned().collect())
    }

    fn get_roster_entry(&self, holder: &HolderKey) -> Result<Option<RosterEntry>> {
        self.read(|s| s.roster.get(holder).cloned())
    }

    fn get_roster_entry_by_external_id(&self, external_id: &str) -> Result<Option<RosterEntry>> {
        self.read(|s| s.roster.values().find(|e| e.external_id == external_id).cloned())
    }

    fn upsert_roster_entry(&self, entry: RosterEntry) -> Result<()> {
        self.write(|s| s.upsert_roster_entry(entry))
    }

    fn remove_roster_entry(&self, holder: &HolderKey) -> Result<bool> {
        self.write(|s| Ok(s.remove_roster_entry(holder)))
    }

    fn set_notify_preference(
        &self,
        holder: &HolderKey,
        preference: NotifyPreference,
    ) -> Result<()> {
        self.write(|s| s.set_notify_preference(holder, preference))
    }
}

impl<T: StateAccess> CursorStore for T {
    fn get_cursor(&self, holder: &HolderKey) -> Result<Option<NotificationCursor>> {
        self.read(|s| s.cursors.get(holder).cloned())
    }

    fn set_shift_started(&self, holder: &HolderKey, started: bool) -> Result<()> {
        self.write(|s| {
            s.cursor_mut(holder).shift_started = started;
            Ok(())
        })
    }

    fn set_last_notified_at(&self, holder: &HolderKey, at: DateTime<Utc>) -> Result<()> {
        self.write(|s| {
            s.cursor_mut(holder).last_notified_at = Some(at);
            Ok(())
        })
    }

    fn reset_cursor(&self, holder: &HolderKey) -> Result<()> {
        self.write(|s| {
            *s.cursor_mut(holder) = NotificationCursor::empty(holder.clone());
            debug!(holder = %holder, "cursor reset");
            Ok(())
        })
    }
}

impl<T: StateAccess> SettingsStore for T {
    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.read(|s| s.settings.get(key).cloned())
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.write(|s| {
            s.settings.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }
}

//! Maps an instant to the holders on duty.

use chrono::{DateTime, Utc};
use serde::Serialize;

use oncall_core::HolderKey;

use crate::config::ScheduleConfig;
use crate::time::{is_on_shift, ShiftDefinition, WallTime};

/// A shift that covers the queried instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveShift {
    pub shift: ShiftDefinition,
    pub is_weekend_shift: bool,
}

impl ActiveShift {
    pub fn holder(&self) -> &HolderKey {
        &self.shift.holder
    }

    pub fn start(&self) -> WallTime {
        self.shift.start
    }

    pub fn end(&self) -> WallTime {
        self.shift.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderStatus {
    pub on_shift: bool,
    pub shift: Option<ActiveShift>,
}

/// Everything a holder is scheduled for, independent of the current instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderSchedule {
    pub weekday: Vec<ShiftDefinition>,
    /// `(group name, shifts)` for every rotation group the holder appears in.
    pub weekend: Vec<(String, Vec<ShiftDefinition>)>,
}

impl HolderSchedule {
    pub fn is_empty(&self) -> bool {
        self.weekday.is_empty() && self.weekend.is_empty()
    }
}

impl ScheduleConfig {
    pub fn is_weekend(&self, t: DateTime<Utc>) -> bool {
        self.weekend_window.contains(&self.local(t))
    }

    /// All shifts covering `t`. A holder may appear more than once.
    pub fn active_shifts(&self, t: DateTime<Utc>) -> Vec<ActiveShift> {
        let weekend = self.is_weekend(t);
        let table = if weekend {
            &self.active_rotation_group(t).shifts
        } else {
            &self.weekday_shifts
        };
        table
            .iter()
            .filter(|s| is_on_shift(s, t, self.base_tz))
            .map(|s| ActiveShift {
                shift: s.clone(),
                is_weekend_shift: weekend,
            })
            .collect()
    }

    /// First matching active shift for `holder`, if any.
    pub fn holder_status(&self, holder: &HolderKey, t: DateTime<Utc>) -> HolderStatus {
        let shift = self
            .active_shifts(t)
            .into_iter()
            .find(|a| a.holder() == holder);
        HolderStatus {
            on_shift: shift.is_some(),
            shift,
        }
    }

    pub fn holder_schedule(&self, holder: &HolderKey) -> HolderSchedule {
        HolderSchedule {
            weekday: self
                .weekday_shifts
                .iter()
                .filter(|s| &s.holder == holder)
                .cloned()
                .collect(),
            weekend: self.rotation.groups_for(holder),
        }
    }

    /// Reminder cadence for an active shift.
    pub fn reminder_interval(&self, shift: &ActiveShift) -> chrono::Duration {
        self.reminder_intervals.for_shift(shift.is_weekend_shift)
    }
}

//! Raw YAML shapes for the schedule file.
//!
//! These mirror the file layout one-to-one and carry no invariants; they are
//! converted into validated types by
//! [`ScheduleConfig::from_file`](super::ScheduleConfig::from_file).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleFile {
    pub timezone: String,
    pub weekend_window: WindowFile,
    pub reminder_intervals: IntervalsFile,
    pub heads_up: HeadsUpFile,
    pub weekday_shifts: Vec<ShiftFile>,
    pub rotation: RotationFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowFile {
    pub start: WindowEdgeFile,
    pub end: WindowEdgeFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowEdgeFile {
    pub weekday: String,
    pub hour: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntervalsFile {
    pub weekday_minutes: u32,
    pub weekend_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeadsUpFile {
    pub weekdays: Vec<String>,
    pub hour: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShiftFile {
    pub holder: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RotationFile {
    /// `YYYY-MM-DD`, interpreted in the base timezone.
    pub anchor_date: String,
    pub cycle_length_weeks: u32,
    pub groups: Vec<GroupFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupFile {
    pub name: String,
    #[serde(default)]
    pub shifts: Vec<ShiftFile>,
}

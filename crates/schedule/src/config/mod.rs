//! Schedule configuration: YAML file → validated [`ScheduleConfig`].
//!
//! Every shape check happens here, once, at load time. A config that makes
//! it out of [`ScheduleConfig::from_file`] is safe to hand to the resolver
//! and the notification loop without further validation.

mod schema;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use tracing::info;

use crate::error::{Result, ScheduleError};
use crate::rotation::{RotationConfig, RotationGroup};
use crate::time::{parse_timezone, ShiftDefinition, WeekendWindow};

pub use schema::{
    GroupFile, HeadsUpFile, IntervalsFile, RotationFile, ScheduleFile, ShiftFile, WindowEdgeFile,
    WindowFile,
};

const REFERENCE_YAML: &str = include_str!("reference.yml");

/// Reminder cadence while a holder stays on shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderIntervals {
    pub weekday_minutes: u32,
    pub weekend_minutes: u32,
}

impl ReminderIntervals {
    pub fn new(weekday_minutes: u32, weekend_minutes: u32) -> Result<Self> {
        if weekday_minutes == 0 || weekend_minutes == 0 {
            return Err(ScheduleError::Validation(
                "reminder intervals must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            weekday_minutes,
            weekend_minutes,
        })
    }

    pub fn for_shift(&self, is_weekend_shift: bool) -> Duration {
        let minutes = if is_weekend_shift {
            self.weekend_minutes
        } else {
            self.weekday_minutes
        };
        Duration::minutes(i64::from(minutes))
    }
}

/// When the upcoming-weekend announcement goes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadsUpSchedule {
    pub weekdays: Vec<Weekday>,
    pub hour: u32,
}

impl HeadsUpSchedule {
    pub fn new(weekdays: Vec<Weekday>, hour: u32) -> Result<Self> {
        if weekdays.is_empty() {
            return Err(ScheduleError::Validation(
                "heads-up needs at least one weekday".to_string(),
            ));
        }
        if hour > 23 {
            return Err(ScheduleError::InvalidHour(hour));
        }
        Ok(Self { weekdays, hour })
    }

    /// True during the whole trigger hour of a trigger weekday (base timezone).
    pub fn is_due<T: Datelike + Timelike>(&self, local: &T) -> bool {
        local.hour() == self.hour && self.weekdays.contains(&local.weekday())
    }
}

/// The validated, immutable schedule.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub base_tz: Tz,
    pub weekend_window: WeekendWindow,
    pub weekday_shifts: Vec<ShiftDefinition>,
    pub rotation: RotationConfig,
    pub reminder_intervals: ReminderIntervals,
    pub heads_up: HeadsUpSchedule,
}

impl ScheduleConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: ScheduleFile = serde_yaml::from_str(yaml)?;
        Self::from_file(file)
    }

    /// Read and validate a schedule file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        info!(path = %path.display(), "schedule loaded");
        Ok(config)
    }

    /// The built-in schedule compiled into the binary.
    pub fn reference() -> Result<Self> {
        Self::from_yaml_str(REFERENCE_YAML)
    }

    /// Load `path` when given, otherwise the built-in reference schedule.
    pub fn load_or_reference(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::reference(),
        }
    }

    pub fn from_file(file: ScheduleFile) -> Result<Self> {
        let base_tz = parse_timezone(&file.timezone)?;

        let weekend_window = WeekendWindow::new(
            parse_weekday(&file.weekend_window.start.weekday)?,
            file.weekend_window.start.hour,
            parse_weekday(&file.weekend_window.end.weekday)?,
            file.weekend_window.end.hour,
        )?;

        let weekday_shifts = convert_shifts(&file.weekday_shifts)?;
        if weekday_shifts.is_empty() {
            return Err(ScheduleError::Validation(
                "weekday_shifts must not be empty".to_string(),
            ));
        }

        let anchor_date = NaiveDate::parse_from_str(file.rotation.anchor_date.trim(), "%Y-%m-%d")
            .map_err(|e| {
                ScheduleError::Validation(format!(
                    "invalid rotation anchor_date '{}': {e}",
                    file.rotation.anchor_date
                ))
            })?;
        let groups = file
            .rotation
            .groups
            .iter()
            .map(|g| {
                if g.name.trim().is_empty() {
                    return Err(ScheduleError::Validation(
                        "rotation group name must not be empty".to_string(),
                    ));
                }
                Ok(RotationGroup {
                    name: g.name.trim().to_string(),
                    shifts: convert_shifts(&g.shifts)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let rotation = RotationConfig::new(anchor_date, file.rotation.cycle_length_weeks, groups)?;

        let reminder_intervals = ReminderIntervals::new(
            file.reminder_intervals.weekday_minutes,
            file.reminder_intervals.weekend_minutes,
        )?;

        let heads_up = HeadsUpSchedule::new(
            file.heads_up
                .weekdays
                .iter()
                .map(|d| parse_weekday(d))
                .collect::<Result<Vec<_>>>()?,
            file.heads_up.hour,
        )?;

        Ok(Self {
            base_tz,
            weekend_window,
            weekday_shifts,
            rotation,
            reminder_intervals,
            heads_up,
        })
    }

    /// `t` as a wall clock in the base timezone.
    pub fn local(&self, t: DateTime<Utc>) -> DateTime<Tz> {
        t.with_timezone(&self.base_tz)
    }

    /// Base-timezone calendar date of `t` as `YYYY-MM-DD`.
    pub fn local_date_string(&self, t: DateTime<Utc>) -> String {
        self.local(t).format("%Y-%m-%d").to_string()
    }

    pub fn log_summary(&self) {
        info!("Schedule (base timezone: {}):", self.base_tz.name());
        info!("  weekend window: {}", self.weekend_window);
        info!("  weekday shifts: {}", self.weekday_shifts.len());
        info!(
            "  rotation:       {} groups, anchor {}",
            self.rotation.groups.len(),
            self.rotation.anchor_date
        );
        info!(
            "  reminders:      weekday={}m, weekend={}m",
            self.reminder_intervals.weekday_minutes, self.reminder_intervals.weekend_minutes
        );
        info!(
            "  heads-up:       {:?} at {:02}:00",
            self.heads_up.weekdays, self.heads_up.hour
        );
    }
}

fn parse_weekday(raw: &str) -> Result<Weekday> {
    Weekday::from_str(raw.trim()).map_err(|_| ScheduleError::InvalidWeekday(raw.to_string()))
}

fn convert_shifts(raw: &[ShiftFile]) -> Result<Vec<ShiftDefinition>> {
    raw.iter()
        .map(|s| ShiftDefinition::parse(&s.holder, &s.start, &s.end))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    const MINIMAL: &str = r#"
timezone: Europe/Berlin
weekend_window:
  start: { weekday: Sat, hour: 0 }
  end: { weekday: Mon, hour: 0 }
reminder_intervals: { weekday_minutes: 20, weekend_minutes: 60 }
heads_up: { weekdays: [Thu], hour: 9 }
weekday_shifts:
  - { holder: alice, start: "09:00", end: "17:00" }
rotation:
  anchor_date: "2026-01-05"
  cycle_length_weeks: 1
  groups:
    - name: ONLY
      shifts:
        - { holder: bob, start: "00:00", end: "00:00" }
"#;

    #[test]
    fn reference_config_loads() {
        let cfg = ScheduleConfig::reference().unwrap();
        assert_eq!(cfg.base_tz, chrono_tz::America::Chicago);
        assert_eq!(cfg.weekday_shifts.len(), 8);
        assert_eq!(cfg.rotation.groups.len(), 3);
        assert_eq!(cfg.rotation.anchor_date, NaiveDate::from_ymd_opt(2026, 2, 15).unwrap());
        assert_eq!(cfg.weekend_window.start_weekday, Weekday::Fri);
        assert_eq!(cfg.weekend_window.start_hour, 22);
        assert_eq!(cfg.heads_up.weekdays, vec![Weekday::Wed, Weekday::Fri]);
    }

    #[test]
    fn minimal_config_normalizes_holders() {
        let cfg = ScheduleConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(cfg.weekday_shifts[0].holder.as_str(), "ALICE");
        assert_eq!(cfg.rotation.groups[0].shifts[0].holder.as_str(), "BOB");
        assert_eq!(cfg.reminder_intervals.for_shift(true), Duration::minutes(60));
        assert_eq!(cfg.reminder_intervals.for_shift(false), Duration::minutes(20));
    }

    #[test]
    fn invalid_timezone_is_rejected() {
        let yaml = MINIMAL.replace("Europe/Berlin", "Mars/Olympus");
        assert!(matches!(
            ScheduleConfig::from_yaml_str(&yaml),
            Err(ScheduleError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn malformed_time_is_rejected() {
        let yaml = MINIMAL.replace("\"17:00\"", "\"25:00\"");
        assert!(matches!(
            ScheduleConfig::from_yaml_str(&yaml),
            Err(ScheduleError::InvalidTime(_))
        ));
    }

    #[test]
    fn cycle_mismatch_is_rejected() {
        let yaml = MINIMAL.replace("cycle_length_weeks: 1", "cycle_length_weeks: 2");
        assert!(matches!(
            ScheduleConfig::from_yaml_str(&yaml),
            Err(ScheduleError::CycleMismatch { .. })
        ));
    }

    #[test]
    fn bad_weekday_and_zero_interval_are_rejected() {
        let yaml = MINIMAL.replace("[Thu]", "[Someday]");
        assert!(matches!(
            ScheduleConfig::from_yaml_str(&yaml),
            Err(ScheduleError::InvalidWeekday(_))
        ));
        let yaml = MINIMAL.replace("weekday_minutes: 20", "weekday_minutes: 0");
        assert!(matches!(
            ScheduleConfig::from_yaml_str(&yaml),
            Err(ScheduleError::Validation(_))
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = format!("{MINIMAL}\nextra: true\n");
        assert!(matches!(
            ScheduleConfig::from_yaml_str(&yaml),
            Err(ScheduleError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.yml");
        fs::write(&path, MINIMAL).unwrap();
        let cfg = ScheduleConfig::load(&path).unwrap();
        assert_eq!(cfg.base_tz, chrono_tz::Europe::Berlin);

        let missing = dir.path().join("missing.yml");
        assert!(matches!(ScheduleConfig::load(&missing), Err(ScheduleError::Io(_))));
    }

    #[test]
    fn heads_up_due_for_whole_hour() {
        let h = HeadsUpSchedule::new(vec![Weekday::Fri], 12).unwrap();
        let fri_noon = NaiveDateTime::parse_from_str("2026-03-06 12:00", "%Y-%m-%d %H:%M").unwrap();
        let fri_1259 = NaiveDateTime::parse_from_str("2026-03-06 12:59", "%Y-%m-%d %H:%M").unwrap();
        let fri_1300 = NaiveDateTime::parse_from_str("2026-03-06 13:00", "%Y-%m-%d %H:%M").unwrap();
        let thu_noon = NaiveDateTime::parse_from_str("2026-03-05 12:00", "%Y-%m-%d %H:%M").unwrap();
        assert!(h.is_due(&fri_noon));
        assert!(h.is_due(&fri_1259));
        assert!(!h.is_due(&fri_1300));
        assert!(!h.is_due(&thu_noon));
        assert!(HeadsUpSchedule::new(vec![], 12).is_err());
        assert!(HeadsUpSchedule::new(vec![Weekday::Fri], 24).is_err());
    }

    #[test]
    fn local_date_string_uses_base_timezone() {
        let cfg = ScheduleConfig::reference().unwrap();
        // 03:00 UTC on the 7th is still the evening of the 6th in Chicago.
        let t = Utc.with_ymd_and_hms(2026, 3, 7, 3, 0, 0).unwrap();
        assert_eq!(cfg.local_date_string(t), "2026-03-06");
    }
}

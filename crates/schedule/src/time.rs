//! Time and shift calculus.
//!
//! Pure functions that map instants to shift membership and weekend-window
//! membership, and that place base-timezone wall-clock times onto concrete
//! instants for display in other zones. Nothing here reads the clock.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, DurationRound, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Timelike, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use oncall_core::HolderKey;

use crate::error::{Result, ScheduleError};

pub const MINUTES_PER_DAY: u32 = 24 * 60;
const MINUTES_PER_WEEK: u32 = 7 * MINUTES_PER_DAY;

// ── WallTime ────────────────────────────────────────────────────────

/// A wall-clock time of day at minute granularity, `00:00` through `24:00`.
///
/// `24:00` is kept distinct from `00:00`: it means "end of this day".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WallTime {
    minutes: u32,
}

impl WallTime {
    pub const MIDNIGHT: WallTime = WallTime { minutes: 0 };
    pub const END_OF_DAY: WallTime = WallTime {
        minutes: MINUTES_PER_DAY,
    };

    pub fn from_hm(hour: u32, minute: u32) -> Result<Self> {
        let valid = (hour < 24 && minute < 60) || (hour == 24 && minute == 0);
        if !valid {
            return Err(ScheduleError::InvalidTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self {
            minutes: hour * 60 + minute,
        })
    }

    /// Parse `HH:mm` (or `H:mm`).
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || ScheduleError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u32 = h.parse().map_err(|_| invalid())?;
        let minute: u32 = m.parse().map_err(|_| invalid())?;
        Self::from_hm(hour, minute).map_err(|_| invalid())
    }

    /// Minutes since midnight, `0..=1440`.
    pub fn minutes(self) -> u32 {
        self.minutes
    }

    pub fn hour(self) -> u32 {
        self.minutes / 60
    }

    pub fn minute(self) -> u32 {
        self.minutes % 60
    }

    pub fn is_end_of_day(self) -> bool {
        self.minutes == MINUTES_PER_DAY
    }

    /// Place this wall clock on `date`. `24:00` lands on the following day at `00:00`.
    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        if self.is_end_of_day() {
            (date + Duration::days(1)).and_time(NaiveTime::MIN)
        } else {
            // from_hm guarantees a valid time below 24:00
            date.and_time(
                NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN),
            )
        }
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for WallTime {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for WallTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WallTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        WallTime::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ── ShiftDefinition ─────────────────────────────────────────────────

/// One duty slot authored in the base timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftDefinition {
    pub holder: HolderKey,
    pub start: WallTime,
    pub end: WallTime,
}

impl ShiftDefinition {
    pub fn new(holder: HolderKey, start: WallTime, end: WallTime) -> Result<Self> {
        if start.is_end_of_day() {
            return Err(ScheduleError::InvalidTime(format!(
                "shift for {holder} cannot start at 24:00"
            )));
        }
        Ok(Self { holder, start, end })
    }

    /// Build from raw strings, as found in a schedule file.
    pub fn parse(holder: &str, start: &str, end: &str) -> Result<Self> {
        Self::new(HolderKey::new(holder)?, WallTime::parse(start)?, WallTime::parse(end)?)
    }

    /// `end <= start`, except the literal `24:00`. `start == end` is a 24-hour shift.
    pub fn crosses_midnight(&self) -> bool {
        !self.end.is_end_of_day() && self.end.minutes() <= self.start.minutes()
    }

    /// Whether minute-of-day `m` (0..1440) is inside this shift.
    pub fn is_on_shift_minute(&self, m: u32) -> bool {
        let s = self.start.minutes();
        let e = self.end.minutes();
        if self.crosses_midnight() {
            m >= s || m < e
        } else {
            s <= m && m < e
        }
    }
}

/// Minutes since local midnight; seconds are ignored.
pub fn minute_of_day<T: Timelike>(t: &T) -> u32 {
    t.hour() * 60 + t.minute()
}

/// `t` with seconds and sub-seconds dropped.
pub fn truncate_to_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::minutes(1)).unwrap_or(t)
}

/// Whether `t`, read as a wall clock in `tz`, falls inside `shift`.
pub fn is_on_shift(shift: &ShiftDefinition, t: DateTime<Utc>, tz: Tz) -> bool {
    shift.is_on_shift_minute(minute_of_day(&t.with_timezone(&tz)))
}

// ── Instant resolution ──────────────────────────────────────────────

/// Resolve a base-timezone wall clock to an instant.
///
/// Ambiguous times (DST fall-back) resolve to the earliest instant; times
/// inside a DST gap move forward to the first minute that exists.
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Tz> {
    if let Some(dt) = tz.from_local_datetime(&local).earliest() {
        return dt;
    }
    (1..=180)
        .find_map(|m| {
            tz.from_local_datetime(&(local + Duration::minutes(m)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&local))
}

/// The end of `shift` placed relative to the base-timezone day of `reference`.
///
/// The end falls on the following calendar day when it is `24:00` or when the
/// shift crosses midnight; otherwise on the reference day.
pub fn shift_end_instant(
    shift: &ShiftDefinition,
    reference: DateTime<Utc>,
    tz: Tz,
) -> DateTime<Tz> {
    let day = reference.with_timezone(&tz).date_naive();
    let end_day = if shift.crosses_midnight() {
        day + Duration::days(1)
    } else {
        day
    };
    resolve_local(tz, shift.end.on(end_day))
}

/// End of the occupancy of `shift` that contains `now`.
///
/// Same as [`shift_end_instant`] except in the after-midnight part of a
/// crossing shift, where the end is later on `now`'s own day.
pub fn occupancy_end_instant(shift: &ShiftDefinition, now: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    let local = now.with_timezone(&tz);
    if shift.crosses_midnight() && minute_of_day(&local) < shift.end.minutes() {
        return resolve_local(tz, shift.end.on(local.date_naive()));
    }
    shift_end_instant(shift, now, tz)
}

/// Resolve a base wall clock on `base_date` and express it in `target`.
pub fn convert_wall_clock_to_zone(
    time: WallTime,
    base_date: NaiveDate,
    base_tz: Tz,
    target: Tz,
) -> DateTime<Tz> {
    resolve_local(base_tz, time.on(base_date)).with_timezone(&target)
}

/// Start and end of `shift` starting on `base_date`, expressed in `target`.
///
/// The midnight rule is applied on the base wall clock before conversion, so
/// a zone ahead of base never moves the calendar day twice.
pub fn shift_bounds_in_zone(
    shift: &ShiftDefinition,
    base_date: NaiveDate,
    base_tz: Tz,
    target: Tz,
) -> (DateTime<Tz>, DateTime<Tz>) {
    let start = convert_wall_clock_to_zone(shift.start, base_date, base_tz, target);
    let end_date = if shift.crosses_midnight() {
        base_date + Duration::days(1)
    } else {
        base_date
    };
    let end = convert_wall_clock_to_zone(shift.end, end_date, base_tz, target);
    (start, end)
}

/// `3:00 PM CST` style display string.
pub fn format_local(dt: &DateTime<Tz>) -> String {
    dt.format("%-I:%M %p %Z").to_string()
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ScheduleError::InvalidTimezone(name.to_string()))
}

/// Validate an IANA zone name. Never errors; callers surface their own message.
pub fn is_valid_timezone(name: &str) -> bool {
    !name.trim().is_empty() && parse_timezone(name).is_ok()
}

// ── WeekendWindow ───────────────────────────────────────────────────

/// The span of the week, in the base timezone, during which rotation groups
/// replace the weekday table. Days strictly between start and end are fully
/// included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekendWindow {
    pub start_weekday: Weekday,
    pub start_hour: u32,
    pub end_weekday: Weekday,
    pub end_hour: u32,
}

impl WeekendWindow {
    pub fn new(
        start_weekday: Weekday,
        start_hour: u32,
        end_weekday: Weekday,
        end_hour: u32,
    ) -> Result<Self> {
        for hour in [start_hour, end_hour] {
            if hour > 23 {
                return Err(ScheduleError::InvalidHour(hour));
            }
        }
        let window = Self {
            start_weekday,
            start_hour,
            end_weekday,
            end_hour,
        };
        if window.start_position() == window.end_position() {
            return Err(ScheduleError::Validation(
                "weekend window start and end must differ".to_string(),
            ));
        }
        Ok(window)
    }

    fn start_position(&self) -> u32 {
        self.start_weekday.num_days_from_monday() * MINUTES_PER_DAY + self.start_hour * 60
    }

    fn end_position(&self) -> u32 {
        self.end_weekday.num_days_from_monday() * MINUTES_PER_DAY + self.end_hour * 60
    }

    /// Length of the window in minutes.
    pub fn length_minutes(&self) -> u32 {
        (self.end_position() + MINUTES_PER_WEEK - self.start_position()) % MINUTES_PER_WEEK
    }

    /// Whether a local (base timezone) wall clock lies in `[start, end)`.
    pub fn contains<T: Datelike + Timelike>(&self, local: &T) -> bool {
        let p = week_position(local);
        let s = self.start_position();
        let e = self.end_position();
        if s < e {
            s <= p && p < e
        } else {
            p >= s || p < e
        }
    }

    /// Wall-clock start of the window containing `local`, or of the next one.
    pub fn current_or_next_start(&self, local: NaiveDateTime) -> NaiveDateTime {
        let minute = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0);
        let truncated = local.date().and_time(minute.unwrap_or(NaiveTime::MIN));
        let p = week_position(&local);
        let s = self.start_position();
        if self.contains(&local) {
            let back = (p + MINUTES_PER_WEEK - s) % MINUTES_PER_WEEK;
            truncated - Duration::minutes(i64::from(back))
        } else {
            let ahead = (s + MINUTES_PER_WEEK - p) % MINUTES_PER_WEEK;
            truncated + Duration::minutes(i64::from(ahead))
        }
    }

    /// Wall-clock end of the window that starts at `start`.
    pub fn end_after(&self, start: NaiveDateTime) -> NaiveDateTime {
        start + Duration::minutes(i64::from(self.length_minutes()))
    }
}

impl fmt::Display for WeekendWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}:00 → {} {:02}:00",
            self.start_weekday, self.start_hour, self.end_weekday, self.end_hour
        )
    }
}

fn week_position<T: Datelike + Timelike>(t: &T) -> u32 {
    t.weekday().num_days_from_monday() * MINUTES_PER_DAY + minute_of_day(t)
}

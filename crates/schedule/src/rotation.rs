//! Weekend rotation selection.
//!
//! The active group is a pure function of the calendar: whole ISO weeks
//! between the anchor date's Monday and the query date's Monday, modulo the
//! cycle length. Because the distance is computed on calendar dates rather
//! than elapsed seconds, DST transitions never shift the count.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use oncall_core::HolderKey;

use crate::config::ScheduleConfig;
use crate::error::{Result, ScheduleError};
use crate::time::{resolve_local, ShiftDefinition};

/// One alternative weekend assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationGroup {
    pub name: String,
    pub shifts: Vec<ShiftDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    pub anchor_date: NaiveDate,
    pub cycle_length_weeks: u32,
    pub groups: Vec<RotationGroup>,
}

impl RotationConfig {
    pub fn new(
        anchor_date: NaiveDate,
        cycle_length_weeks: u32,
        groups: Vec<RotationGroup>,
    ) -> Result<Self> {
        if groups.is_empty() {
            return Err(ScheduleError::Validation(
                "rotation must define at least one group".to_string(),
            ));
        }
        if cycle_length_weeks as usize != groups.len() {
            return Err(ScheduleError::CycleMismatch {
                cycle_length_weeks,
                groups: groups.len(),
            });
        }
        Ok(Self {
            anchor_date,
            cycle_length_weeks,
            groups,
        })
    }

    /// Monday of the ISO week containing `date`.
    pub fn week_start(date: NaiveDate) -> NaiveDate {
        date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
    }

    /// Signed number of whole ISO weeks from the anchor's week to `date`'s week.
    pub fn weeks_since_anchor(&self, date: NaiveDate) -> i64 {
        let days = (Self::week_start(date) - Self::week_start(self.anchor_date)).num_days();
        days.div_euclid(7)
    }

    /// Index in `[0, cycle_length_weeks)`, non-negative before the anchor too.
    pub fn rotation_index(&self, date: NaiveDate) -> usize {
        self.weeks_since_anchor(date)
            .rem_euclid(i64::from(self.cycle_length_weeks)) as usize
    }

    pub fn active_group(&self, date: NaiveDate) -> &RotationGroup {
        &self.groups[self.rotation_index(date)]
    }

    /// Groups that include `holder`, with only that holder's shifts.
    pub fn groups_for(&self, holder: &HolderKey) -> Vec<(String, Vec<ShiftDefinition>)> {
        self.groups
            .iter()
            .filter_map(|g| {
                let shifts: Vec<_> =
                    g.shifts.iter().filter(|s| &s.holder == holder).cloned().collect();
                (!shifts.is_empty()).then(|| (g.name.clone(), shifts))
            })
            .collect()
    }
}

/// The weekend currently in progress, or the next one to start.
#[derive(Debug, Clone, Serialize)]
pub struct UpcomingWeekend<'a> {
    pub group: &'a RotationGroup,
    pub index: usize,
    /// `true` when the query instant was already inside the window.
    pub in_progress: bool,
    pub weekend_start: DateTime<Tz>,
    pub weekend_end: DateTime<Tz>,
    /// Saturday 00:00 of this weekend, base timezone.
    pub saturday: DateTime<Tz>,
    /// Sunday 00:00 of this weekend, base timezone.
    pub sunday: DateTime<Tz>,
}

/// A contiguous stretch of the weekend covered by one holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineSlot {
    pub holder: HolderKey,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl ScheduleConfig {
    pub fn rotation_index(&self, t: DateTime<Utc>) -> usize {
        self.rotation
            .rotation_index(t.with_timezone(&self.base_tz).date_naive())
    }

    pub fn active_rotation_group(&self, t: DateTime<Utc>) -> &RotationGroup {
        &self.rotation.groups[self.rotation_index(t)]
    }

    /// The weekend containing `t`, or the next one if `t` is outside a window.
    ///
    /// While a window is in progress its group is the one active at `t`, the
    /// same group the resolver uses for the weekend shifts.
    pub fn upcoming_weekend(&self, t: DateTime<Utc>) -> UpcomingWeekend<'_> {
        let tz = self.base_tz;
        let local = t.with_timezone(&tz);
        let in_progress = self.weekend_window.contains(&local);

        let start_naive = self.weekend_window.current_or_next_start(local.naive_local());
        let end_naive = self.weekend_window.end_after(start_naive);

        let reference_date = if in_progress {
            local.date_naive()
        } else {
            start_naive.date()
        };
        let index = self.rotation.rotation_index(reference_date);

        let saturday_date = next_weekday_on_or_after(start_naive.date(), Weekday::Sat);
        let sunday_date = saturday_date + Duration::days(1);

        UpcomingWeekend {
            group: &self.rotation.groups[index],
            index,
            in_progress,
            weekend_start: resolve_local(tz, start_naive),
            weekend_end: resolve_local(tz, end_naive),
            saturday: resolve_local(tz, saturday_date.and_time(chrono::NaiveTime::MIN)),
            sunday: resolve_local(tz, sunday_date.and_time(chrono::NaiveTime::MIN)),
        }
    }

    /// Lay the group's shifts over every day of the window, clip them to the
    /// window bounds and merge touching slots of the same holder.
    pub fn weekend_timeline(&self, weekend: &UpcomingWeekend<'_>) -> Vec<TimelineSlot> {
        let window_start = weekend.weekend_start.naive_local();
        let window_end = weekend.weekend_end.naive_local();

        let mut slots: Vec<(HolderKey, NaiveDateTime, NaiveDateTime)> = Vec::new();
        // Start one day early so a crossing shift that began the day before is seen.
        let mut date = window_start.date() - Duration::days(1);
        while date <= window_end.date() {
            for shift in &weekend.group.shifts {
                let start = shift.start.on(date);
                let end_date = if shift.crosses_midnight() {
                    date + Duration::days(1)
                } else {
                    date
                };
                let end = shift.end.on(end_date);

                let clipped_start = start.max(window_start);
                let clipped_end = end.min(window_end);
                if clipped_start < clipped_end {
                    slots.push((shift.holder.clone(), clipped_start, clipped_end));
                }
            }
            date += Duration::days(1);
        }

        slots.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut merged: Vec<(HolderKey, NaiveDateTime, NaiveDateTime)> = Vec::new();
        for (holder, start, end) in slots {
            if let Some(last) = merged.iter_mut().rev().find(|m| m.0 == holder) {
                if start <= last.2 {
                    last.2 = last.2.max(end);
                    continue;
                }
            }
            merged.push((holder, start, end));
        }
        merged.sort_by(|a, b| a.1.cmp(&b.1));

        merged
            .into_iter()
            .map(|(holder, start, end)| TimelineSlot {
                holder,
                start: resolve_local(self.base_tz, start),
                end: resolve_local(self.base_tz, end),
            })
            .collect()
    }
}

fn next_weekday_on_or_after(date: NaiveDate, target: Weekday) -> NaiveDate {
    let ahead = (target.num_days_from_monday() + 7 - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(i64::from(ahead))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use chrono_tz::America::Chicago;

    fn group(name: &str) -> RotationGroup {
        RotationGroup {
            name: name.to_string(),
            shifts: vec![],
        }
    }

    fn three_groups() -> RotationConfig {
        RotationConfig::new(
            NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(),
            3,
            vec![group("WEEKEND1"), group("WEEKEND2"), group("WEEKEND3")],
        )
        .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_start_is_monday() {
        assert_eq!(RotationConfig::week_start(date(2026, 2, 15)), date(2026, 2, 9));
        assert_eq!(RotationConfig::week_start(date(2026, 2, 16)), date(2026, 2, 16));
    }

    #[test]
    fn index_advances_per_iso_week() {
        let r = three_groups();
        // Anchor is a Sunday; its ISO week runs Mon 02-09 .. Sun 02-15.
        assert_eq!(r.rotation_index(date(2026, 2, 15)), 0);
        assert_eq!(r.rotation_index(date(2026, 2, 9)), 0);
        assert_eq!(r.rotation_index(date(2026, 2, 16)), 1);
        assert_eq!(r.rotation_index(date(2026, 2, 27)), 2);
        assert_eq!(r.rotation_index(date(2026, 3, 6)), 0);
    }

    #[test]
    fn index_is_non_negative_before_anchor() {
        let r = three_groups();
        assert_eq!(r.rotation_index(date(2026, 2, 8)), 2);
        assert_eq!(r.rotation_index(date(2026, 2, 1)), 1);
        assert_eq!(r.rotation_index(date(2026, 1, 25)), 0);
    }

    #[test]
    fn cycle_mismatch_is_rejected() {
        let groups = vec![group("A"), group("B"), group("C")];
        let err = RotationConfig::new(date(2026, 2, 15), 2, groups);
        assert!(matches!(
            err,
            Err(ScheduleError::CycleMismatch { cycle_length_weeks: 2, groups: 3 })
        ));
        assert!(RotationConfig::new(date(2026, 2, 15), 0, vec![]).is_err());
    }

    #[test]
    fn groups_for_holder_filters_shifts() {
        let mut r = three_groups();
        r.groups[1].shifts = vec![
            ShiftDefinition::parse("QUEEN", "00:00", "07:00").unwrap(),
            ShiftDefinition::parse("BGAMES", "07:00", "19:00").unwrap(),
        ];
        let queen = HolderKey::new("queen").unwrap();
        let found = r.groups_for(&queen);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "WEEKEND2");
        assert_eq!(found[0].1.len(), 1);
    }

    #[test]
    fn next_saturday_helper() {
        assert_eq!(next_weekday_on_or_after(date(2026, 3, 6), Weekday::Sat), date(2026, 3, 7));
        assert_eq!(next_weekday_on_or_after(date(2026, 3, 7), Weekday::Sat), date(2026, 3, 7));
    }

    #[test]
    fn upcoming_weekend_reports_concrete_dates() {
        let cfg = ScheduleConfig::reference().unwrap();
        // Wednesday 2026-03-04 noon.
        let t = Chicago.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap().with_timezone(&Utc);
        let w = cfg.upcoming_weekend(t);
        assert!(!w.in_progress);
        assert_eq!(w.weekend_start.date_naive(), date(2026, 3, 6));
        assert_eq!(w.weekend_start.hour(), 22);
        assert_eq!(w.saturday.date_naive(), date(2026, 3, 7));
        assert_eq!(w.sunday.date_naive(), date(2026, 3, 8));
        assert_eq!(w.weekend_end.date_naive(), date(2026, 3, 8));
        assert_eq!(w.group.name, "WEEKEND1");
    }
}

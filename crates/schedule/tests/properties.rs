//! Behavioural properties of the schedule crate, exercised through the public API.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::America::Chicago;
use chrono_tz::Asia::Tokyo;

use oncall_core::HolderKey;
use oncall_schedule::{
    format_local, is_on_shift, shift_bounds_in_zone, RotationConfig, RotationGroup,
    ScheduleConfig, ShiftDefinition,
};

fn chicago(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Chicago
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn shift(holder: &str, start: &str, end: &str) -> ShiftDefinition {
    ShiftDefinition::parse(holder, start, end).unwrap()
}

fn groups(n: usize) -> Vec<RotationGroup> {
    (0..n)
        .map(|i| RotationGroup {
            name: format!("G{i}"),
            shifts: vec![],
        })
        .collect()
}

const QUEEN_ONLY: &str = r#"
timezone: America/Chicago
weekend_window:
  start: { weekday: Fri, hour: 22 }
  end: { weekday: Sun, hour: 22 }
reminder_intervals: { weekday_minutes: 30, weekend_minutes: 45 }
heads_up: { weekdays: [Wed, Fri], hour: 12 }
weekday_shifts:
  - { holder: QUEEN, start: "22:00", end: "03:00" }
rotation:
  anchor_date: "2026-02-15"
  cycle_length_weeks: 3
  groups:
    - name: WEEKEND1
      shifts: [{ holder: ED, start: "00:00", end: "24:00" }]
    - name: WEEKEND2
      shifts: [{ holder: QUEEN, start: "00:00", end: "24:00" }]
    - name: WEEKEND3
      shifts: [{ holder: KLABO, start: "00:00", end: "24:00" }]
"#;

// ── Shift minute ranges ─────────────────────────────────────────────

#[test]
fn normal_shift_minute_range() {
    let s = shift("HAAX", "07:00", "12:00");
    assert!(is_on_shift(&s, chicago(2026, 3, 3, 7, 0), Chicago));
    assert!(is_on_shift(&s, chicago(2026, 3, 3, 11, 59), Chicago));
    assert!(!is_on_shift(&s, chicago(2026, 3, 3, 12, 0), Chicago));
    assert!(!is_on_shift(&s, chicago(2026, 3, 3, 6, 59), Chicago));
}

#[test]
fn crossing_shift_minute_range() {
    let s = shift("QUEEN", "22:00", "03:00");
    assert!(is_on_shift(&s, chicago(2026, 3, 3, 23, 0), Chicago));
    assert!(is_on_shift(&s, chicago(2026, 3, 4, 2, 59), Chicago));
    assert!(!is_on_shift(&s, chicago(2026, 3, 4, 3, 0), Chicago));
    assert!(!is_on_shift(&s, chicago(2026, 3, 4, 12, 0), Chicago));
}

#[test]
fn end_of_day_shift_minute_range() {
    let s = shift("ED", "19:00", "24:00");
    assert!(!s.crosses_midnight());
    assert!(is_on_shift(&s, chicago(2026, 3, 3, 23, 59), Chicago));
    assert!(!is_on_shift(&s, chicago(2026, 3, 4, 0, 0), Chicago));
}

#[test]
fn equal_start_and_end_is_a_full_day() {
    let s = shift("ALL", "06:00", "06:00");
    for hour in 0..24 {
        assert!(is_on_shift(&s, chicago(2026, 3, 3, hour, 0), Chicago), "hour {hour}");
    }
}

#[test]
fn seconds_are_ignored() {
    let s = shift("HAAX", "07:00", "12:00");
    let t = chicago(2026, 3, 3, 11, 59) + Duration::seconds(59);
    assert!(is_on_shift(&s, t, Chicago));
}

// ── Rotation ────────────────────────────────────────────────────────

#[test]
fn rotation_index_is_periodic() {
    for cycle in 1..=5u32 {
        for anchor_offset in 0..7 {
            let anchor =
                NaiveDate::from_ymd_opt(2025, 10, 1).unwrap() + Duration::days(anchor_offset);
            let r = RotationConfig::new(anchor, cycle, groups(cycle as usize)).unwrap();
            let mut d = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
            while d < NaiveDate::from_ymd_opt(2026, 6, 1).unwrap() {
                let later = d + Duration::weeks(i64::from(cycle));
                assert_eq!(r.rotation_index(d), r.rotation_index(later));
                d += Duration::days(5);
            }
        }
    }
}

#[test]
fn shifting_anchor_and_query_by_whole_weeks_keeps_index() {
    // The span crosses both 2025-11-02 and 2026-03-08 DST transitions.
    let anchor = NaiveDate::from_ymd_opt(2025, 9, 14).unwrap();
    let base = RotationConfig::new(anchor, 3, groups(3)).unwrap();
    for n in [1i64, 7, 25, 52] {
        let shifted =
            RotationConfig::new(anchor + Duration::weeks(n), 3, groups(3)).unwrap();
        let mut d = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        while d < NaiveDate::from_ymd_opt(2026, 4, 1).unwrap() {
            assert_eq!(base.rotation_index(d), shifted.rotation_index(d + Duration::weeks(n)));
            d += Duration::days(3);
        }
    }
}

#[test]
fn rotation_index_survives_dst_change() {
    let cfg = ScheduleConfig::reference().unwrap();
    // Saturday before and Saturday after the 2026-03-08 spring-forward.
    let before = cfg.rotation_index(chicago(2026, 3, 7, 1, 30));
    let after = cfg.rotation_index(chicago(2026, 3, 14, 1, 30));
    assert_eq!((before + 1) % 3, after);
}

#[test]
fn three_groups_anchored_on_sunday() {
    let cfg = ScheduleConfig::reference().unwrap();
    let at_anchor = cfg.active_rotation_group(chicago(2026, 2, 15, 12, 0));
    assert_eq!(cfg.rotation_index(chicago(2026, 2, 15, 12, 0)), 0);
    assert_eq!(at_anchor.name, "WEEKEND1");

    // Three weeks and a day into the cycle, counted from the anchor's week.
    let later = cfg.active_rotation_group(chicago(2026, 3, 3, 12, 0));
    assert_eq!(at_anchor.name, later.name);
    assert_eq!(cfg.rotation_index(chicago(2026, 3, 8, 23, 0)), 0);

    // The anchor is a Sunday, so the Monday after it already starts week 1.
    assert_eq!(cfg.rotation_index(chicago(2026, 2, 16, 0, 0)), 1);
    assert_eq!(cfg.rotation_index(chicago(2026, 3, 9, 12, 0)), 1);
}

// ── Weekend window ──────────────────────────────────────────────────

#[test]
fn sunday_boundary_switches_back_to_weekday_table() {
    let cfg = ScheduleConfig::from_yaml_str(QUEEN_ONLY).unwrap();
    let before = chicago(2026, 3, 8, 21, 59);
    let at = chicago(2026, 3, 8, 22, 0);

    assert!(cfg.is_weekend(before));
    let active = cfg.active_shifts(before);
    assert_eq!(active.len(), 1);
    assert!(active[0].is_weekend_shift);

    assert!(!cfg.is_weekend(at));
    let active = cfg.active_shifts(at);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].holder().as_str(), "QUEEN");
    assert!(!active[0].is_weekend_shift);
}

#[test]
fn saturday_is_fully_weekend() {
    let cfg = ScheduleConfig::reference().unwrap();
    assert!(!cfg.is_weekend(chicago(2026, 3, 6, 21, 59)));
    assert!(cfg.is_weekend(chicago(2026, 3, 6, 22, 0)));
    assert!(cfg.is_weekend(chicago(2026, 3, 7, 0, 0)));
    assert!(cfg.is_weekend(chicago(2026, 3, 7, 23, 59)));
}

#[test]
fn upcoming_weekend_inside_window_is_current() {
    let cfg = ScheduleConfig::reference().unwrap();
    let inside = cfg.upcoming_weekend(chicago(2026, 3, 7, 15, 0));
    assert!(inside.in_progress);
    assert_eq!(inside.weekend_start.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 6).unwrap());
    assert_eq!(inside.saturday.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 7).unwrap());
    assert_eq!(inside.group.name, cfg.active_rotation_group(chicago(2026, 3, 7, 15, 0)).name);

    let late_sunday = cfg.upcoming_weekend(chicago(2026, 3, 8, 21, 59));
    assert!(late_sunday.in_progress);
    assert_eq!(late_sunday.index, inside.index);
}

#[test]
fn upcoming_weekend_one_minute_before_start_is_next() {
    let cfg = ScheduleConfig::reference().unwrap();
    let w = cfg.upcoming_weekend(chicago(2026, 3, 13, 21, 59));
    assert!(!w.in_progress);
    assert_eq!(w.weekend_start.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 13).unwrap());
    assert_eq!(w.weekend_start.hour(), 22);
    assert_eq!(w.group.name, "WEEKEND2");

    // Sunday after the window closed points at next Friday.
    let w = cfg.upcoming_weekend(chicago(2026, 3, 8, 22, 0));
    assert!(!w.in_progress);
    assert_eq!(w.weekend_start.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 13).unwrap());
    assert_eq!(w.weekend_start.date_naive().weekday(), Weekday::Fri);
}

#[test]
fn weekend_timeline_merges_adjacent_slots() {
    let cfg = ScheduleConfig::reference().unwrap();
    let w = cfg.upcoming_weekend(chicago(2026, 3, 4, 12, 0));
    let timeline = cfg.weekend_timeline(&w);

    let summary: Vec<(String, String, String)> = timeline
        .iter()
        .map(|s| {
            (
                s.holder.to_string(),
                s.start.format("%a %H:%M").to_string(),
                s.end.format("%a %H:%M").to_string(),
            )
        })
        .collect();
    let expected = [
        ("ED", "Fri 22:00", "Sat 07:00"),
        ("HAAX", "Sat 07:00", "Sat 19:00"),
        ("ED", "Sat 19:00", "Sun 07:00"),
        ("HAAX", "Sun 07:00", "Sun 19:00"),
        ("ED", "Sun 19:00", "Sun 22:00"),
    ];
    assert_eq!(summary.len(), expected.len());
    for (got, want) in summary.iter().zip(expected.iter()) {
        assert_eq!((got.0.as_str(), got.1.as_str(), got.2.as_str()), *want);
    }
}

// ── Resolver / display ──────────────────────────────────────────────

#[test]
fn queen_on_duty_at_ten_pm() {
    let cfg = ScheduleConfig::from_yaml_str(QUEEN_ONLY).unwrap();
    let t = chicago(2026, 3, 3, 22, 0);
    let active = cfg.active_shifts(t);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].holder(), &HolderKey::new("queen").unwrap());
    assert!(!active[0].is_weekend_shift);

    let json = serde_json::to_value(&active[0]).unwrap();
    assert_eq!(json["shift"]["start"], "22:00");
    assert_eq!(json["is_weekend_shift"], false);
}

#[test]
fn night_shift_shown_in_tokyo_keeps_single_day_shift() {
    let s = shift("QUEEN", "22:00", "03:00");
    let base_date = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
    let (start, end) = shift_bounds_in_zone(&s, base_date, Chicago, Tokyo);
    assert_eq!(start.format("%Y-%m-%d %H:%M").to_string(), "2026-01-15 13:00");
    assert_eq!(end.format("%Y-%m-%d %H:%M").to_string(), "2026-01-15 18:00");
    assert_eq!(format_local(&end), "6:00 PM JST");
}

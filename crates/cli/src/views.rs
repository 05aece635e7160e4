//! Read-only views printed by the query commands.
//!
//! Each view is built from the schedule, the roster and an explicit instant,
//! serializes for `--json`, and renders itself as text otherwise.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use oncall_core::HolderKey;
use oncall_notify::templating::{HeadsUpContext, DEFAULT_HEADS_UP};
use oncall_notify::{NotifyError, TemplateRenderer};
use oncall_schedule::{
    format_local, occupancy_end_instant, shift_bounds_in_zone, ScheduleConfig, ShiftDefinition,
};
use oncall_store::RosterEntry;

// ── On duty ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct OnDutyView {
    pub at: DateTime<Utc>,
    pub timezone: String,
    pub weekend: bool,
    /// Active rotation group while inside the weekend window.
    pub group: Option<String>,
    pub entries: Vec<OnDutyEntry>,
}

#[derive(Debug, Serialize)]
pub struct OnDutyEntry {
    pub holder: HolderKey,
    pub registered: bool,
    pub until: String,
    pub until_iso: String,
}

impl OnDutyView {
    pub fn build(
        schedule: &ScheduleConfig,
        roster: &[RosterEntry],
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Self {
        let weekend = schedule.is_weekend(now);
        let entries = schedule
            .active_shifts(now)
            .into_iter()
            .map(|active| {
                let end = occupancy_end_instant(&active.shift, now, schedule.base_tz)
                    .with_timezone(&tz);
                OnDutyEntry {
                    registered: roster.iter().any(|e| &e.holder == active.holder()),
                    holder: active.shift.holder,
                    until: format_local(&end),
                    until_iso: end.to_rfc3339(),
                }
            })
            .collect();
        Self {
            at: now,
            timezone: tz.name().to_string(),
            weekend,
            group: weekend.then(|| schedule.active_rotation_group(now).name.clone()),
            entries,
        }
    }

    pub fn to_text(&self) -> String {
        if self.entries.is_empty() {
            return "🔇 Nobody is currently on shift.".to_string();
        }
        let kind = match &self.group {
            Some(group) => format!("🗓️ Weekend Rotation ({group})"),
            None => "📅 Weekday Schedule".to_string(),
        };
        let mut out = format!("🟢 Currently On Duty — {kind}\n(times in {})\n\n", self.timezone);
        for entry in &self.entries {
            let note = if entry.registered { "" } else { "  (not on roster)" };
            let _ = writeln!(out, "• {} — until {}{}", entry.holder, entry.until, note);
        }
        out.trim_end().to_string()
    }
}

// ── Holder status ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusView {
    pub holder: HolderKey,
    pub on_shift: bool,
    pub is_weekend_shift: bool,
    pub until: Option<String>,
}

impl StatusView {
    pub fn build(
        schedule: &ScheduleConfig,
        holder: &HolderKey,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Self {
        let status = schedule.holder_status(holder, now);
        let until = status.shift.as_ref().map(|active| {
            let end = occupancy_end_instant(&active.shift, now, schedule.base_tz);
            format_local(&end.with_timezone(&tz))
        });
        Self {
            holder: holder.clone(),
            on_shift: status.on_shift,
            is_weekend_shift: status.shift.as_ref().is_some_and(|s| s.is_weekend_shift),
            until,
        }
    }

    pub fn to_text(&self) -> String {
        match &self.until {
            Some(until) => format!("🟢 {} is on shift until {}", self.holder, until),
            None => format!("⚪ {} is off shift", self.holder),
        }
    }
}

// ── Weekend ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct WeekendView {
    pub index: usize,
    pub in_progress: bool,
    pub weekend_start: String,
    pub weekend_end: String,
    #[serde(flatten)]
    pub context: HeadsUpContext,
}

impl WeekendView {
    pub fn build(schedule: &ScheduleConfig, now: DateTime<Utc>) -> Self {
        let weekend = schedule.upcoming_weekend(now);
        let timeline = schedule.weekend_timeline(&weekend);
        let context = oncall_ping::heads_up::build_context(&weekend, &timeline, &HashMap::new());
        Self {
            index: weekend.index,
            in_progress: weekend.in_progress,
            weekend_start: weekend.weekend_start.to_rfc3339(),
            weekend_end: weekend.weekend_end.to_rfc3339(),
            context,
        }
    }

    pub fn to_text(&self) -> Result<String, NotifyError> {
        TemplateRenderer::new().render(DEFAULT_HEADS_UP, &self.context)
    }
}

// ── Holder schedule ───────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ShiftsView {
    pub holder: HolderKey,
    pub timezone: String,
    pub weekday: Vec<SlotView>,
    /// Group name → shifts in that group.
    pub weekend: BTreeMap<String, Vec<SlotView>>,
    pub upcoming_group: String,
    pub on_call_upcoming_weekend: bool,
}

#[derive(Debug, Serialize)]
pub struct SlotView {
    pub start: String,
    pub end: String,
}

impl ShiftsView {
    pub fn build(
        schedule: &ScheduleConfig,
        holder: &HolderKey,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Self {
        let assigned = schedule.holder_schedule(holder);
        let base_date = schedule.local(now).date_naive();
        let slots = |shifts: &[ShiftDefinition]| -> Vec<SlotView> {
            shifts
                .iter()
                .map(|shift| {
                    let (start, end) = shift_bounds_in_zone(shift, base_date, schedule.base_tz, tz);
                    SlotView {
                        start: format_local(&start),
                        end: format_local(&end),
                    }
                })
                .collect()
        };

        let upcoming = schedule.upcoming_weekend(now);
        Self {
            holder: holder.clone(),
            timezone: tz.name().to_string(),
            weekday: slots(assigned.weekday.as_slice()),
            weekend: assigned
                .weekend
                .iter()
                .map(|(group, shifts)| (group.clone(), slots(shifts.as_slice())))
                .collect(),
            upcoming_group: upcoming.group.name.clone(),
            on_call_upcoming_weekend: upcoming.group.shifts.iter().any(|s| &s.holder == holder),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = format!(
            "📋 Schedule for {} (times in {})\n\nWeekday shifts:\n",
            self.holder, self.timezone
        );
        if self.weekday.is_empty() {
            out.push_str("  none assigned\n");
        }
        for slot in &self.weekday {
            let _ = writeln!(out, "  • {} → {}", slot.start, slot.end);
        }

        out.push_str("\nWeekend rotation shifts:\n");
        if self.weekend.is_empty() {
            out.push_str("  none assigned\n");
        }
        for (group, slots) in &self.weekend {
            let _ = writeln!(out, "  {group}:");
            for slot in slots {
                let _ = writeln!(out, "    • {} → {}", slot.start, slot.end);
            }
        }

        out.push('\n');
        if self.on_call_upcoming_weekend {
            let _ = write!(out, "✅ On call this weekend ({})", self.upcoming_group);
        } else {
            let _ = write!(out, "💤 Not on call this weekend ({} is active)", self.upcoming_group);
        }
        out
    }
}

// ── Roster ────────────────────────────────────────────────────

pub fn roster_text(entries: &[RosterEntry], channel: Option<&str>) -> String {
    let mut out = format!("👥 Roster ({})\n", entries.len());
    if entries.is_empty() {
        out.push_str("  (none registered)\n");
    }
    for e in entries {
        let _ = writeln!(
            out,
            "• {} — {} · {} · {}",
            e.holder,
            e.external_id,
            e.timezone,
            e.notify_preference.label()
        );
    }
    let _ = write!(out, "\nChannel: {}", channel.unwrap_or("(not set)"));
    out
}

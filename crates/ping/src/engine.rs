//! One evaluation of the roster against the schedule.
//!
//! A tick reads the delivery channel, resolves who is on shift, decides per
//! roster entry whether a shift-start notice, a reminder or a cursor reset is
//! due, sends everything concurrently and records each attempt. The weekly
//! heads-up announcement is checked at the end of the same tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use oncall_core::config::PingConfig;
use oncall_core::{HolderKey, NotifyPreference};
use oncall_notify::templating::ShiftMessageContext;
use oncall_notify::{
    Delivery, DeliveryRequest, DispatchOutcome, Dispatcher, MessageTemplates, TemplateRenderer,
};
use oncall_schedule::{
    format_local, occupancy_end_instant, parse_timezone, truncate_to_minute, ActiveShift,
    ScheduleConfig,
};
use oncall_store::{NotificationCursor, RosterEntry, Store, PING_CHANNEL_ID};

use crate::error::PingError;
use crate::heads_up::{self, HeadsUpReport};

// ── Report types ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoChannel,
    EmptyRoster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ShiftStart,
    Reminder,
}

/// One notification attempt made during a tick.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationRecord {
    pub kind: NotificationKind,
    pub outcome: DispatchOutcome,
}

/// Summary of a single tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick_id: Uuid,
    pub at: DateTime<Utc>,
    pub skipped: Option<SkipReason>,
    /// Roster entries found on shift.
    pub on_shift: usize,
    pub notifications: Vec<NotificationRecord>,
    /// Holders whose cursor was cleared because they went off shift.
    pub resets: Vec<HolderKey>,
    pub heads_up: Option<HeadsUpReport>,
    pub elapsed_ms: u64,
}

impl TickReport {
    fn new(tick_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            tick_id,
            at,
            skipped: None,
            on_shift: 0,
            notifications: Vec::new(),
            resets: Vec::new(),
            heads_up: None,
            elapsed_ms: 0,
        }
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.notifications.iter().filter(|n| n.kind == kind).count()
    }
}

// ── Planning ──────────────────────────────────────────────────

/// What a single roster entry needs this tick.
#[derive(Debug)]
enum Action {
    ShiftStart(ActiveShift),
    Reminder(ActiveShift),
    Reset,
    Nothing,
}

fn plan(
    schedule: &ScheduleConfig,
    entry: &RosterEntry,
    shift: Option<&ActiveShift>,
    cursor: &NotificationCursor,
    now: DateTime<Utc>,
) -> Action {
    match shift {
        None if cursor.has_activity() => Action::Reset,
        None => Action::Nothing,
        Some(_) if entry.notify_preference == NotifyPreference::None => Action::Nothing,
        Some(shift) if !cursor.shift_started => Action::ShiftStart(shift.clone()),
        Some(_) if entry.notify_preference == NotifyPreference::Channel => Action::Nothing,
        Some(shift) => {
            // Minute granularity: tick jitter must not push a reminder to the next tick.
            let due = cursor.last_notified_at.map_or(true, |last| {
                truncate_to_minute(now) - truncate_to_minute(last)
                    >= schedule.reminder_interval(shift)
            });
            if due {
                Action::Reminder(shift.clone())
            } else {
                Action::Nothing
            }
        }
    }
}

/// A rendered message waiting to be sent.
struct Job {
    kind: NotificationKind,
    request: DeliveryRequest,
}

// ── Engine ────────────────────────────────────────────────────

pub struct PingEngine {
    schedule: Arc<ScheduleConfig>,
    store: Arc<dyn Store>,
    delivery: Arc<dyn Delivery>,
    templates: MessageTemplates,
    renderer: TemplateRenderer,
    config: PingConfig,
}

impl PingEngine {
    /// Build an engine with the default message templates.
    pub fn new(
        schedule: Arc<ScheduleConfig>,
        store: Arc<dyn Store>,
        delivery: Arc<dyn Delivery>,
        config: PingConfig,
    ) -> Self {
        Self {
            schedule,
            store,
            delivery,
            templates: MessageTemplates::default(),
            renderer: TemplateRenderer::new(),
            config,
        }
    }

    /// Replace the message templates. Syntax is checked up front.
    pub fn with_templates(mut self, templates: MessageTemplates) -> Result<Self, PingError> {
        templates.validate(&self.renderer)?;
        self.templates = templates;
        Ok(self)
    }

    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub fn config(&self) -> &PingConfig {
        &self.config
    }

    /// Run one evaluation at `now`.
    ///
    /// A failed tick is still held to the time budget before the error is
    /// returned.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, PingError> {
        let tick_id = Uuid::new_v4();
        let span = tracing::info_span!("tick", %tick_id);
        let started = Instant::now();
        let result = self
            .tick_inner(tick_id, now, started)
            .instrument(span.clone())
            .await;
        if result.is_err() {
            span.in_scope(|| self.check_budget(started));
        }
        result
    }

    async fn tick_inner(
        &self,
        tick_id: Uuid,
        now: DateTime<Utc>,
        started: Instant,
    ) -> Result<TickReport, PingError> {
        let mut report = TickReport::new(tick_id, now);

        let Some(channel_id) = self.store.get_setting(PING_CHANNEL_ID)? else {
            debug!("no delivery channel configured, skipping tick");
            report.skipped = Some(SkipReason::NoChannel);
            return Ok(self.finish(report, started));
        };

        let roster = self.store.list_roster_entries()?;
        if roster.is_empty() {
            debug!("roster is empty, skipping tick");
            report.skipped = Some(SkipReason::EmptyRoster);
            return Ok(self.finish(report, started));
        }

        // First matching shift per holder wins.
        let mut active: HashMap<HolderKey, ActiveShift> = HashMap::new();
        for shift in self.schedule.active_shifts(now) {
            active.entry(shift.holder().clone()).or_insert(shift);
        }

        let mut jobs = Vec::new();
        for entry in &roster {
            let shift = active.get(&entry.holder);
            if shift.is_some() {
                report.on_shift += 1;
            }
            let cursor = self
                .store
                .get_cursor(&entry.holder)?
                .unwrap_or_else(|| NotificationCursor::empty(entry.holder.clone()));

            match plan(&self.schedule, entry, shift, &cursor, now) {
                Action::ShiftStart(shift) => {
                    let text = self.render_shift(&self.templates.shift_start, entry, &shift, now)?;
                    jobs.push(Job {
                        kind: NotificationKind::ShiftStart,
                        request: request_for(entry, text),
                    });
                }
                Action::Reminder(shift) => {
                    let text = self.render_shift(&self.templates.reminder, entry, &shift, now)?;
                    jobs.push(Job {
                        kind: NotificationKind::Reminder,
                        request: request_for(entry, text),
                    });
                }
                Action::Reset => {
                    self.store.reset_cursor(&entry.holder)?;
                    info!(holder = %entry.holder, "holder went off shift, cursor reset");
                    report.resets.push(entry.holder.clone());
                }
                Action::Nothing => {}
            }
        }

        let dispatcher = Dispatcher::new(
            self.delivery.clone(),
            channel_id,
            self.config.delivery_timeout(),
        );

        let sends = jobs.into_iter().map(|job| self.execute(&dispatcher, job, now));
        let results = join_all(sends).await;
        // Every attempt is recorded before the first store failure is surfaced.
        let mut first_error = None;
        for result in results {
            match result {
                Ok(record) => report.notifications.push(record),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        report.heads_up = heads_up::maybe_announce(
            &self.schedule,
            self.store.as_ref(),
            &dispatcher,
            &self.renderer,
            &self.templates.heads_up,
            &roster,
            now,
        )
        .await?;

        Ok(self.finish(report, started))
    }

    /// Send one job and record the attempt on the holder's cursor.
    async fn execute(
        &self,
        dispatcher: &Dispatcher,
        job: Job,
        now: DateTime<Utc>,
    ) -> Result<NotificationRecord, PingError> {
        let holder = &job.request.holder;
        let outcome = match job.kind {
            NotificationKind::ShiftStart => {
                let outcome = dispatcher.deliver(&job.request, true).await;
                self.store.set_shift_started(holder, true)?;
                outcome
            }
            NotificationKind::Reminder => dispatcher.deliver(&job.request, false).await,
        };
        if outcome.attempted() {
            self.store.set_last_notified_at(holder, now)?;
        }
        Ok(NotificationRecord {
            kind: job.kind,
            outcome,
        })
    }

    fn render_shift(
        &self,
        template: &str,
        entry: &RosterEntry,
        shift: &ActiveShift,
        now: DateTime<Utc>,
    ) -> Result<String, PingError> {
        let tz = self.recipient_zone(entry);
        let end =
            occupancy_end_instant(&shift.shift, now, self.schedule.base_tz).with_timezone(&tz);
        let ctx = ShiftMessageContext {
            holder: entry.holder.to_string(),
            end: format_local(&end),
            end_iso: end.to_rfc3339(),
            timezone: tz.name().to_string(),
            is_weekend_shift: shift.is_weekend_shift,
        };
        Ok(self.renderer.render(template, &ctx)?)
    }

    /// The entry's own zone, or the base zone when the stored name is unusable.
    fn recipient_zone(&self, entry: &RosterEntry) -> Tz {
        match parse_timezone(&entry.timezone) {
            Ok(tz) => tz,
            Err(_) => {
                warn!(
                    holder = %entry.holder,
                    timezone = %entry.timezone,
                    fallback = %self.schedule.base_tz,
                    "invalid roster timezone, using base timezone"
                );
                self.schedule.base_tz
            }
        }
    }

    /// Milliseconds since `started`, warning when over the tick budget.
    fn check_budget(&self, started: Instant) -> u64 {
        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;
        if elapsed > self.config.tick_budget() {
            warn!(
                elapsed_ms,
                budget_ms = self.config.tick_budget_ms,
                "tick exceeded time budget"
            );
        }
        elapsed_ms
    }

    fn finish(&self, mut report: TickReport, started: Instant) -> TickReport {
        report.elapsed_ms = self.check_budget(started);
        debug!(
            on_shift = report.on_shift,
            sent = report.notifications.len(),
            resets = report.resets.len(),
            elapsed_ms = report.elapsed_ms,
            "tick complete"
        );
        report
    }
}

fn request_for(entry: &RosterEntry, text: String) -> DeliveryRequest {
    DeliveryRequest {
        holder: entry.holder.clone(),
        external_id: entry.external_id.clone(),
        preference: entry.notify_preference,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn entry(pref: NotifyPreference) -> RosterEntry {
        RosterEntry::new(HolderKey::new("QUEEN").unwrap(), "42", "America/New_York")
            .with_preference(pref)
    }

    fn shift() -> ActiveShift {
        ActiveShift {
            shift: oncall_schedule::ShiftDefinition::parse("QUEEN", "22:00", "03:00").unwrap(),
            is_weekend_shift: false,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 4, 0, 0).unwrap()
    }

    #[test]
    fn off_shift_with_activity_resets() {
        let schedule = ScheduleConfig::reference().unwrap();
        let mut cursor = NotificationCursor::empty(HolderKey::new("QUEEN").unwrap());
        let dm = entry(NotifyPreference::Dm);
        assert!(matches!(plan(&schedule, &dm, None, &cursor, now()), Action::Nothing));
        cursor.shift_started = true;
        assert!(matches!(plan(&schedule, &dm, None, &cursor, now()), Action::Reset));
    }

    #[test]
    fn channel_preference_never_gets_reminders() {
        let schedule = ScheduleConfig::reference().unwrap();
        let mut cursor = NotificationCursor::empty(HolderKey::new("QUEEN").unwrap());
        cursor.shift_started = true;
        cursor.last_notified_at = Some(now() - Duration::hours(2));
        let s = shift();
        assert!(matches!(
            plan(&schedule, &entry(NotifyPreference::Channel), Some(&s), &cursor, now()),
            Action::Nothing
        ));
        assert!(matches!(
            plan(&schedule, &entry(NotifyPreference::Dm), Some(&s), &cursor, now()),
            Action::Reminder(_)
        ));
    }

    #[test]
    fn reminder_waits_for_interval() {
        let schedule = ScheduleConfig::reference().unwrap();
        let mut cursor = NotificationCursor::empty(HolderKey::new("QUEEN").unwrap());
        cursor.shift_started = true;
        cursor.last_notified_at = Some(now() - Duration::minutes(29));
        let s = shift();
        assert!(matches!(
            plan(&schedule, &entry(NotifyPreference::Dm), Some(&s), &cursor, now()),
            Action::Nothing
        ));
        cursor.last_notified_at = Some(now() - Duration::minutes(30));
        assert!(matches!(
            plan(&schedule, &entry(NotifyPreference::Dm), Some(&s), &cursor, now()),
            Action::Reminder(_)
        ));
    }

    #[test]
    fn reminder_ignores_sub_minute_jitter() {
        let schedule = ScheduleConfig::reference().unwrap();
        let mut cursor = NotificationCursor::empty(HolderKey::new("QUEEN").unwrap());
        cursor.shift_started = true;
        cursor.last_notified_at = Some(now() + Duration::milliseconds(600));
        let s = shift();
        let dm = entry(NotifyPreference::Dm);
        let at = now() + Duration::minutes(30) + Duration::milliseconds(200);
        assert!(matches!(plan(&schedule, &dm, Some(&s), &cursor, at), Action::Reminder(_)));
        let early = now() + Duration::minutes(29) + Duration::seconds(59);
        assert!(matches!(plan(&schedule, &dm, Some(&s), &cursor, early), Action::Nothing));
    }

    #[test]
    fn none_preference_leaves_everything_alone() {
        let schedule = ScheduleConfig::reference().unwrap();
        let cursor = NotificationCursor::empty(HolderKey::new("QUEEN").unwrap());
        let s = shift();
        assert!(matches!(
            plan(&schedule, &entry(NotifyPreference::None), Some(&s), &cursor, now()),
            Action::Nothing
        ));
    }
}

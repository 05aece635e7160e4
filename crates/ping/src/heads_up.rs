//! Upcoming-weekend announcement, posted at most once per base-timezone day.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info};

use oncall_core::HolderKey;
use oncall_notify::templating::{HeadsUpContext, SlotContext};
use oncall_notify::{Dispatcher, TemplateRenderer};
use oncall_schedule::{format_local, ScheduleConfig, TimelineSlot, UpcomingWeekend};
use oncall_store::{RosterEntry, SettingsStore, WEEKLY_HEADSUP_LAST_DATE};

use crate::error::PingError;

#[derive(Debug, Clone, Serialize)]
pub struct HeadsUpReport {
    /// Base-timezone date the announcement was made for.
    pub date: String,
    pub group: String,
    pub delivered: bool,
    pub error: Option<String>,
}

/// Post the heads-up when due and not yet posted today.
///
/// The date marker is written after the attempt whether or not it succeeded,
/// so a failing channel does not produce a retry every tick of the hour.
pub(crate) async fn maybe_announce(
    schedule: &ScheduleConfig,
    settings: &(impl SettingsStore + ?Sized),
    dispatcher: &Dispatcher,
    renderer: &TemplateRenderer,
    template: &str,
    roster: &[RosterEntry],
    now: DateTime<Utc>,
) -> Result<Option<HeadsUpReport>, PingError> {
    let local = schedule.local(now);
    if !schedule.heads_up.is_due(&local) {
        return Ok(None);
    }

    let today = schedule.local_date_string(now);
    if settings.get_setting(WEEKLY_HEADSUP_LAST_DATE)?.as_deref() == Some(today.as_str()) {
        debug!(date = %today, "heads-up already posted today");
        return Ok(None);
    }

    let weekend = schedule.upcoming_weekend(now);
    let timeline = schedule.weekend_timeline(&weekend);
    let mentions: HashMap<&HolderKey, String> = roster
        .iter()
        .map(|e| (&e.holder, dispatcher.mention(&e.external_id)))
        .collect();

    let ctx = build_context(&weekend, &timeline, &mentions);
    let text = renderer.render(template, &ctx)?;
    let result = dispatcher.announce(&text).await;
    settings.set_setting(WEEKLY_HEADSUP_LAST_DATE, &today)?;

    info!(
        date = %today,
        group = %weekend.group.name,
        slots = timeline.len(),
        delivered = result.is_ok(),
        "weekend heads-up processed"
    );

    Ok(Some(HeadsUpReport {
        date: today,
        group: weekend.group.name.clone(),
        delivered: result.is_ok(),
        error: result.err().map(|e| e.to_string()),
    }))
}

pub fn build_context(
    weekend: &UpcomingWeekend<'_>,
    timeline: &[TimelineSlot],
    mentions: &HashMap<&HolderKey, String>,
) -> HeadsUpContext {
    let title = if weekend.in_progress {
        "Current Weekend"
    } else {
        "Upcoming Weekend"
    };
    HeadsUpContext {
        title: title.to_string(),
        group: weekend.group.name.clone(),
        date_range: format!(
            "{} – {}",
            weekend.weekend_start.format("%a %b %-d"),
            weekend.weekend_end.format("%a %b %-d")
        ),
        slots: timeline
            .iter()
            .map(|slot| SlotContext {
                holder: slot.holder.to_string(),
                who: mentions
                    .get(&slot.holder)
                    .cloned()
                    .unwrap_or_else(|| format!("**{}**", slot.holder)),
                start: day_and_time(&slot.start),
                end: day_and_time(&slot.end),
            })
            .collect(),
    }
}

fn day_and_time(dt: &DateTime<Tz>) -> String {
    format!("{} {}", dt.format("%a"), format_local(dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn context_mentions_rostered_holders_only() {
        let schedule = ScheduleConfig::reference().unwrap();
        // Wednesday before the first rotation weekend.
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 18, 0, 0).unwrap();
        let weekend = schedule.upcoming_weekend(now);
        let timeline = schedule.weekend_timeline(&weekend);
        let ed = HolderKey::new("ED").unwrap();
        let mut mentions = HashMap::new();
        mentions.insert(&ed, "<@7>".to_string());

        let ctx = build_context(&weekend, &timeline, &mentions);
        assert_eq!(ctx.title, "Upcoming Weekend");
        assert_eq!(ctx.group, weekend.group.name);
        assert!(ctx.date_range.starts_with("Fri "));
        assert!(ctx.date_range.contains(" – Sun "));
        assert_eq!(ctx.slots.len(), timeline.len());
        for slot in &ctx.slots {
            if slot.holder == "ED" {
                assert_eq!(slot.who, "<@7>");
            } else {
                assert_eq!(slot.who, format!("**{}**", slot.holder));
            }
        }
    }
}

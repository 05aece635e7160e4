use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{info, warn};

use oncall_core::{Config, HolderKey};
use oncall_notify::{Delivery, LogDelivery, WebhookDelivery};
use oncall_ping::{PingEngine, PingScheduler, SystemClock};
use oncall_schedule::{is_valid_timezone, parse_timezone, ScheduleConfig};
use oncall_store::{JsonFileStore, RosterEntry, RosterStore, SettingsStore, Store, PING_CHANNEL_ID};

use crate::cli::{AtArgs, CliArgs, Command, RosterCommand, RunArgs};
use crate::views::{roster_text, OnDutyView, ShiftsView, StatusView, WeekendView};

/// Everything a command may need, resolved once from flags and environment.
struct AppContext {
    config: Config,
    schedule: ScheduleConfig,
    state_file: PathBuf,
    json: bool,
}

impl AppContext {
    fn load(args: &CliArgs, config: Config) -> Result<Self> {
        let schedule_path = args.schedule.clone().or_else(|| config.schedule.path.clone());
        let schedule = ScheduleConfig::load_or_reference(schedule_path.as_deref())
            .context("failed to load schedule")?;
        let state_file = args
            .state_file
            .clone()
            .unwrap_or_else(|| config.storage.state_file());
        Ok(Self {
            config,
            schedule,
            state_file,
            json: args.json,
        })
    }

    fn store(&self) -> Result<JsonFileStore> {
        JsonFileStore::open(&self.state_file)
            .with_context(|| format!("failed to open state file {}", self.state_file.display()))
    }

    /// `--tz` if given, else the base timezone.
    fn display_zone(&self, tz: Option<&str>) -> Result<Tz> {
        match tz {
            Some(name) => parse_timezone(name).with_context(|| format!("invalid --tz '{name}'")),
            None => Ok(self.schedule.base_tz),
        }
    }

    fn print<V: Serialize>(&self, view: &V, text: impl FnOnce(&V) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(view)?);
        } else {
            println!("{}", text(view));
        }
        Ok(())
    }
}

fn instant(at: &AtArgs) -> DateTime<Utc> {
    at.at.unwrap_or_else(Utc::now)
}

pub async fn execute(args: CliArgs, config: Config) -> Result<()> {
    let ctx = AppContext::load(&args, config)?;

    match args.command {
        Command::Run(run_args) => run(ctx, run_args).await,
        Command::OnDuty(a) => {
            let tz = ctx.display_zone(a.tz.as_deref())?;
            let roster = ctx.store()?.list_roster_entries()?;
            let view = OnDutyView::build(&ctx.schedule, &roster, instant(&a.at), tz);
            ctx.print(&view, OnDutyView::to_text)
        }
        Command::Status(a) => {
            let tz = holder_zone(&ctx, &a.holder, None)?;
            let view = StatusView::build(&ctx.schedule, &a.holder, instant(&a.at), tz);
            ctx.print(&view, StatusView::to_text)
        }
        Command::Weekend(a) => {
            let view = WeekendView::build(&ctx.schedule, instant(&a));
            let text = view.to_text()?;
            ctx.print(&view, |_| text)
        }
        Command::Shifts(a) => {
            if ctx.schedule.holder_schedule(&a.holder).is_empty() {
                bail!("{} has no shifts in the schedule", a.holder);
            }
            let tz = holder_zone(&ctx, &a.holder, a.tz.as_deref())?;
            let view = ShiftsView::build(&ctx.schedule, &a.holder, instant(&a.at), tz);
            ctx.print(&view, ShiftsView::to_text)
        }
        Command::Roster(cmd) => roster(&ctx, cmd),
        Command::SetChannel { channel_id } => {
            let channel_id = channel_id.trim();
            if channel_id.is_empty() {
                bail!("channel id must not be empty");
            }
            ctx.store()?.set_setting(PING_CHANNEL_ID, channel_id)?;
            info!(channel_id, "delivery channel set");
            println!("✅ Channel set to {channel_id}");
            Ok(())
        }
        Command::CheckConfig => {
            ctx.config.log_summary();
            ctx.schedule.log_summary();
            let group_names: Vec<&str> =
                ctx.schedule.rotation.groups.iter().map(|g| g.name.as_str()).collect();
            let summary = serde_json::json!({
                "config": ctx.config.redacted_summary(),
                "schedule": {
                    "timezone": ctx.schedule.base_tz.name(),
                    "weekend_window": ctx.schedule.weekend_window.to_string(),
                    "weekday_shifts": ctx.schedule.weekday_shifts.len(),
                    "rotation_groups": group_names,
                    "anchor_date": ctx.schedule.rotation.anchor_date.to_string(),
                },
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::CheckTz { zone } => {
            if is_valid_timezone(&zone) {
                println!("✅ {zone} is a valid IANA timezone");
                Ok(())
            } else {
                bail!(
                    "'{zone}' is not a valid IANA timezone (e.g. America/New_York, Europe/London)"
                )
            }
        }
    }
}

/// `--tz` if given, else the holder's roster timezone, else the base timezone.
fn holder_zone(ctx: &AppContext, holder: &HolderKey, tz: Option<&str>) -> Result<Tz> {
    if tz.is_some() {
        return ctx.display_zone(tz);
    }
    let entry = ctx.store()?.get_roster_entry(holder)?;
    Ok(entry
        .and_then(|e| parse_timezone(&e.timezone).ok())
        .unwrap_or(ctx.schedule.base_tz))
}

fn roster(ctx: &AppContext, cmd: RosterCommand) -> Result<()> {
    let store = ctx.store()?;
    match cmd {
        RosterCommand::List => {
            let entries = store.list_roster_entries()?;
            let channel = store.get_setting(PING_CHANNEL_ID)?;
            if ctx.json {
                let doc = serde_json::json!({ "channel": channel, "roster": entries });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                println!("{}", roster_text(&entries, channel.as_deref()));
            }
        }
        RosterCommand::Add {
            holder,
            external_id,
            tz,
            preference,
        } => {
            if ctx.schedule.holder_schedule(&holder).is_empty() {
                bail!("{holder} does not appear in the schedule");
            }
            if !is_valid_timezone(&tz) {
                bail!("'{tz}' is not a valid IANA timezone (e.g. America/New_York, Europe/London)");
            }
            let entry = RosterEntry::new(holder.clone(), external_id.trim(), tz.trim())
                .with_preference(preference);
            store.upsert_roster_entry(entry)?;
            info!(holder = %holder, "roster entry saved");
            println!("✅ Registered {holder} (timezone {}, notify {})", tz.trim(), preference);
        }
        RosterCommand::Remove { holder } => {
            if store.remove_roster_entry(&holder)? {
                info!(holder = %holder, "roster entry removed");
                println!("✅ Removed {holder}");
            } else {
                bail!("{holder} is not on the roster");
            }
        }
        RosterCommand::SetPreference { holder, preference } => {
            store.set_notify_preference(&holder, preference)?;
            info!(holder = %holder, %preference, "notify preference updated");
            println!("✅ {holder} will be notified by: {}", preference.label());
        }
    }
    Ok(())
}

async fn run(ctx: AppContext, args: RunArgs) -> Result<()> {
    ctx.config.log_summary();
    ctx.schedule.log_summary();

    let delivery: Arc<dyn Delivery> = match (&ctx.config.delivery.webhook_url, args.dry_run) {
        (Some(url), false) => Arc::new(
            WebhookDelivery::from_config(url, ctx.config.delivery.webhook_token.as_deref())
                .context("failed to configure webhook delivery")?,
        ),
        (None, false) => {
            warn!("WEBHOOK_URL not set, messages will only be logged");
            Arc::new(LogDelivery::new())
        }
        (_, true) => Arc::new(LogDelivery::new()),
    };
    info!(delivery = delivery.channel_name(), "delivery configured");

    let store: Arc<dyn Store> = Arc::new(ctx.store()?);
    let engine = Arc::new(PingEngine::new(
        Arc::new(ctx.schedule),
        store,
        delivery,
        ctx.config.ping.clone(),
    ));

    if args.once {
        let report = engine.tick(Utc::now()).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let scheduler = PingScheduler::new(engine, Arc::new(SystemClock));
    scheduler.start();
    shutdown_signal().await?;
    info!("shutdown signal received");
    scheduler.stop().await;
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn ctx_in(dir: &tempfile::TempDir, extra: &[&str]) -> (AppContext, CliArgs) {
        let state = dir.path().join("state.json");
        let mut argv = vec!["oncall", "--state-file", state.to_str().unwrap()];
        argv.extend_from_slice(extra);
        let args = CliArgs::try_parse_from(argv).unwrap();
        let ctx = AppContext::load(&args, Config::for_profile("oncall_cli_test")).unwrap();
        (ctx, args)
    }

    #[test]
    fn roster_add_validates_holder_and_timezone() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx_in(&dir, &["check-config"]);

        let unknown = roster(
            &ctx,
            RosterCommand::Add {
                holder: HolderKey::new("nobody").unwrap(),
                external_id: "1".into(),
                tz: "America/Chicago".into(),
                preference: Default::default(),
            },
        );
        assert!(unknown.unwrap_err().to_string().contains("does not appear"));

        let bad_tz = roster(
            &ctx,
            RosterCommand::Add {
                holder: HolderKey::new("ed").unwrap(),
                external_id: "1".into(),
                tz: "Mars/Base".into(),
                preference: Default::default(),
            },
        );
        assert!(bad_tz.unwrap_err().to_string().contains("not a valid IANA timezone"));

        roster(
            &ctx,
            RosterCommand::Add {
                holder: HolderKey::new("ed").unwrap(),
                external_id: " 7 ".into(),
                tz: "America/Chicago".into(),
                preference: Default::default(),
            },
        )
        .unwrap();
        let saved = ctx
            .store()
            .unwrap()
            .get_roster_entry(&HolderKey::new("ED").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(saved.external_id, "7");
    }

    #[test]
    fn roster_remove_missing_holder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx_in(&dir, &["check-config"]);
        let remove = RosterCommand::Remove {
            holder: HolderKey::new("ED").unwrap(),
        };
        let err = roster(&ctx, remove).unwrap_err();
        assert!(err.to_string().contains("not on the roster"));
    }

    #[test]
    fn holder_zone_prefers_flag_then_roster_then_base() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx_in(&dir, &["check-config"]);
        let ed = HolderKey::new("ED").unwrap();

        assert_eq!(holder_zone(&ctx, &ed, None).unwrap(), ctx.schedule.base_tz);

        ctx.store()
            .unwrap()
            .upsert_roster_entry(RosterEntry::new(ed.clone(), "7", "Asia/Tokyo"))
            .unwrap();
        assert_eq!(holder_zone(&ctx, &ed, None).unwrap(), chrono_tz::Asia::Tokyo);
        assert_eq!(
            holder_zone(&ctx, &ed, Some("Europe/London")).unwrap(),
            chrono_tz::Europe::London
        );
        assert!(holder_zone(&ctx, &ed, Some("Nowhere/Land")).is_err());
    }
}

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use oncall_core::{HolderKey, NotifyPreference};

/// On-call rotation and shift notifications.
///
/// Resolves who is on duty from a YAML schedule, keeps the roster in a JSON
/// state file and runs the notification loop.
#[derive(Parser, Debug)]
#[command(name = "oncall", about = "On-call rotation and shift notifications")]
pub struct CliArgs {
    /// Schedule YAML file (built-in reference schedule when unset)
    #[arg(long, global = true, env = "SCHEDULE_FILE")]
    pub schedule: Option<PathBuf>,

    /// State file override (default: $DATA_DIR/$STATE_FILE)
    #[arg(long, global = true)]
    pub state_file: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the notification loop until SIGINT/SIGTERM.
    Run(RunArgs),

    /// Holders on shift right now.
    OnDuty(OnDutyArgs),

    /// Whether one holder is on shift, and until when.
    Status(StatusArgs),

    /// The current or next weekend and who covers it.
    Weekend(AtArgs),

    /// All shifts assigned to a holder.
    Shifts(ShiftsArgs),

    /// Manage roster entries.
    #[command(subcommand)]
    Roster(RosterCommand),

    /// Set the channel used for mentions and announcements.
    SetChannel {
        channel_id: String,
    },

    /// Validate the schedule and print the effective configuration.
    CheckConfig,

    /// Check whether a string is a valid IANA timezone.
    CheckTz {
        zone: String,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Log messages instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Run a single tick and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct AtArgs {
    /// Evaluate at this RFC 3339 instant instead of now
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct OnDutyArgs {
    /// Display timezone (default: schedule base timezone)
    #[arg(long)]
    pub tz: Option<String>,

    #[command(flatten)]
    pub at: AtArgs,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    pub holder: HolderKey,

    #[command(flatten)]
    pub at: AtArgs,
}

#[derive(Args, Debug)]
pub struct ShiftsArgs {
    pub holder: HolderKey,

    /// Display timezone (default: the holder's roster timezone)
    #[arg(long)]
    pub tz: Option<String>,

    #[command(flatten)]
    pub at: AtArgs,
}

#[derive(Subcommand, Debug)]
pub enum RosterCommand {
    /// List roster entries.
    List,

    /// Register or update a holder.
    Add {
        holder: HolderKey,
        /// Chat-platform user id
        external_id: String,
        /// IANA timezone used when rendering times for this person
        #[arg(long)]
        tz: String,
        #[arg(long, default_value = "dm")]
        preference: NotifyPreference,
    },

    /// Remove a holder and its notification state.
    Remove {
        holder: HolderKey,
    },

    /// Change how a holder is notified: dm, channel or none.
    SetPreference {
        holder: HolderKey,
        preference: NotifyPreference,
    },
}

//! Configuration errors raised while building a [`ScheduleConfig`](crate::ScheduleConfig).

use oncall_core::CoreError;

/// Errors that can occur while loading or validating schedule configuration.
///
/// Every variant is fatal at load time: a schedule that fails validation
/// never reaches the notification loop.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid timezone '{0}'")]
    InvalidTimezone(String),

    #[error("malformed shift time '{0}' (expected HH:mm between 00:00 and 24:00)")]
    InvalidTime(String),

    #[error("invalid weekday '{0}'")]
    InvalidWeekday(String),

    #[error("invalid hour {0} (expected 0-23)")]
    InvalidHour(u32),

    #[error("cycle length of {cycle_length_weeks} weeks does not match {groups} rotation groups")]
    CycleMismatch { cycle_length_weeks: u32, groups: usize },

    #[error("invalid holder: {0}")]
    Holder(#[from] CoreError),

    /// Any other structural problem (empty rotation, zero interval, ...).
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result alias for schedule operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;

//! Shift resolution and weekend rotation for the on-call roster.
//!
//! Everything in this crate is pure: callers pass the current instant in,
//! nothing here samples the clock.

pub mod config;
pub mod error;
pub mod resolver;
pub mod rotation;
pub mod time;

pub use config::{HeadsUpSchedule, ReminderIntervals, ScheduleConfig};
pub use error::{Result, ScheduleError};
pub use resolver::{ActiveShift, HolderSchedule, HolderStatus};
pub use rotation::{RotationConfig, RotationGroup, TimelineSlot, UpcomingWeekend};
pub use time::{
    convert_wall_clock_to_zone, format_local, is_on_shift, is_valid_timezone,
    occupancy_end_instant, parse_timezone, shift_bounds_in_zone, shift_end_instant,
    truncate_to_minute, ShiftDefinition, WallTime, WeekendWindow,
};

//! Notification engine: evaluates the roster on a fixed cadence and sends
//! shift-start notices, reminders and the weekend heads-up.

pub mod clock;
pub mod engine;
pub mod error;
pub mod heads_up;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{NotificationKind, NotificationRecord, PingEngine, SkipReason, TickReport};
pub use error::PingError;
pub use heads_up::HeadsUpReport;
pub use scheduler::PingScheduler;

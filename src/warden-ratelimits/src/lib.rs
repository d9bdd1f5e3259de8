//! Usage limits for warden commands.
//!
//! Tracks per-action cooldowns and daily usage counters against an
//! injectable [`Clock`], so hosts can measure cooldowns in simulation ticks
//! and tests can drive time by hand.

pub mod clock;
pub mod display;
pub mod limits;
pub mod tracker;

pub use clock::{Clock, DEFAULT_TICKS_PER_SECOND, ManualClock, SystemClock};
pub use display::{format_usage, format_usage_compact};
pub use limits::{LimitViolation, UsageLimits, UsageSnapshot};
pub use tracker::{Reservation, UsageTracker};

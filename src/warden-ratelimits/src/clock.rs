//! Time sources for usage limits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;

/// Ticks per real second assumed when no simulation clock is available.
pub const DEFAULT_TICKS_PER_SECOND: u32 = 60;

/// Source of the current tick and calendar day.
///
/// Cooldowns are measured in ticks and daily limits in calendar days, both
/// read from the same clock.
pub trait Clock: Send + Sync {
    /// Current tick count.
    fn now_ticks(&self) -> u64;

    /// Current calendar day.
    fn today(&self) -> NaiveDate;
}

/// Wall-clock time mapped onto ticks at a fixed rate.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    ticks_per_second: u32,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_ticks_per_second(DEFAULT_TICKS_PER_SECOND)
    }

    pub fn with_ticks_per_second(ticks_per_second: u32) -> Self {
        Self {
            origin: Instant::now(),
            ticks_per_second: ticks_per_second.max(1),
        }
    }

    pub fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ticks(&self) -> u64 {
        let elapsed = self.origin.elapsed().as_secs_f64();
        (elapsed * f64::from(self.ticks_per_second)) as u64
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock advanced explicitly by the caller.
#[derive(Debug)]
pub struct ManualClock {
    ticks: AtomicU64,
    today: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            today: Mutex::new(today),
        }
    }

    /// Move time forward by `ticks`.
    pub fn advance(&self, ticks: u64) {
        self.ticks.fetch_add(ticks, Ordering::SeqCst);
    }

    pub fn set_ticks(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::SeqCst);
    }

    /// Roll the calendar over to the next day.
    pub fn next_day(&self) {
        let mut today = self.today.lock();
        if let Some(next) = today.succ_opt() {
            *today = next;
        }
    }

    pub fn set_today(&self, day: NaiveDate) {
        *self.today.lock() = day;
    }
}

impl Clock for ManualClock {
    fn now_ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    fn today(&self) -> NaiveDate {
        *self.today.lock()
    }
}

//! Usage tracking.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::limits::{LimitViolation, UsageLimits, UsageSnapshot};

/// Tracker for cooldowns and daily counters across actions.
///
/// Keys are compared case-insensitively. A single tracker is shared by every
/// command built from the same loader; all state sits behind one mutex.
///
/// [`UsageTracker::check`] and [`UsageTracker::record`] each take the lock on
/// their own, so work done between them can race with another caller. Use
/// [`UsageTracker::try_acquire`] when the use must not exceed the limits
/// under concurrent callers.
pub struct UsageTracker {
    clock: Arc<dyn Clock>,
    state: Mutex<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    /// Tick of the last successful use, by key.
    last_used: HashMap<String, u64>,
    /// Uses since the last rollover, by key.
    used_today: HashMap<String, u32>,
    /// Day on which `used_today` was last cleared.
    last_reset: Option<NaiveDate>,
}

impl TrackerState {
    fn roll_day(&mut self, today: NaiveDate) {
        if self.last_reset != Some(today) {
            self.used_today.clear();
            self.last_reset = Some(today);
        }
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

impl UsageTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Tracker driven by wall-clock time.
    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock::new()))
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Check whether `key` may be used now.
    pub fn check(&self, key: &str, limits: &UsageLimits) -> Result<(), LimitViolation> {
        let key = normalize(key);
        let now = self.clock.now_ticks();
        let mut state = self.state.lock();
        state.roll_day(self.clock.today());

        if limits.has_cooldown()
            && let Some(&last) = state.last_used.get(&key)
        {
            let elapsed = now.saturating_sub(last);
            if elapsed < limits.cooldown_ticks {
                return Err(LimitViolation::Cooldown {
                    remaining_ticks: limits.cooldown_ticks - elapsed,
                });
            }
        }

        if limits.has_daily_limit() {
            let used = state.used_today.get(&key).copied().unwrap_or(0);
            if used >= limits.daily_limit {
                return Err(LimitViolation::DailyLimit {
                    limit: limits.daily_limit,
                });
            }
        }

        Ok(())
    }

    /// Record a successful use of `key`.
    pub fn record(&self, key: &str, limits: &UsageLimits) {
        let key = normalize(key);
        let now = self.clock.now_ticks();
        let mut state = self.state.lock();
        state.roll_day(self.clock.today());

        if limits.has_cooldown() {
            state.last_used.insert(key.clone(), now);
        }
        if limits.has_daily_limit() {
            *state.used_today.entry(key).or_insert(0) += 1;
        }
    }

    /// Check the limits and count a use of `key` in one critical section.
    ///
    /// The returned [`Reservation`] holds the use until it is committed.
    /// Dropping it uncommitted gives the use back.
    pub fn try_acquire(
        &self,
        key: &str,
        limits: &UsageLimits,
    ) -> Result<Reservation<'_>, LimitViolation> {
        let key = normalize(key);
        let now = self.clock.now_ticks();
        let today = self.clock.today();
        let mut state = self.state.lock();
        state.roll_day(today);

        if limits.has_cooldown()
            && let Some(&last) = state.last_used.get(&key)
        {
            let elapsed = now.saturating_sub(last);
            if elapsed < limits.cooldown_ticks {
                return Err(LimitViolation::Cooldown {
                    remaining_ticks: limits.cooldown_ticks - elapsed,
                });
            }
        }

        if limits.has_daily_limit() {
            let used = state.used_today.get(&key).copied().unwrap_or(0);
            if used >= limits.daily_limit {
                return Err(LimitViolation::DailyLimit {
                    limit: limits.daily_limit,
                });
            }
        }

        let previous_last_used = if limits.has_cooldown() {
            state.last_used.insert(key.clone(), now)
        } else {
            None
        };
        if limits.has_daily_limit() {
            *state.used_today.entry(key.clone()).or_insert(0) += 1;
        }

        Ok(Reservation {
            tracker: self,
            key,
            limits: *limits,
            held_tick: now,
            previous_last_used,
            day: today,
            committed: false,
        })
    }

    fn release(&self, reservation: &Reservation<'_>) {
        let mut state = self.state.lock();
        let key = &reservation.key;

        if reservation.limits.has_cooldown()
            && state.last_used.get(key) == Some(&reservation.held_tick)
        {
            match reservation.previous_last_used {
                Some(tick) => state.last_used.insert(key.clone(), tick),
                None => state.last_used.remove(key),
            };
        }
        if reservation.limits.has_daily_limit()
            && state.last_reset == Some(reservation.day)
            && let Some(used) = state.used_today.get_mut(key)
        {
            *used = used.saturating_sub(1);
        }
    }

    /// Get the recorded usage for `key`.
    pub fn snapshot(&self, key: &str) -> UsageSnapshot {
        let key = normalize(key);
        let mut state = self.state.lock();
        state.roll_day(self.clock.today());

        UsageSnapshot {
            used_today: state.used_today.get(&key).copied().unwrap_or(0),
            last_used_tick: state.last_used.get(&key).copied(),
        }
    }

    /// Forget everything recorded for `key`.
    pub fn forget(&self, key: &str) {
        let key = normalize(key);
        let mut state = self.state.lock();
        state.last_used.remove(&key);
        state.used_today.remove(&key);
    }

    /// Clear all recorded usage.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.last_used.clear();
        state.used_today.clear();
        state.last_reset = None;
    }
}

/// A use counted by [`UsageTracker::try_acquire`] but not yet confirmed.
#[must_use = "dropping a reservation gives the use back"]
#[derive(Debug)]
pub struct Reservation<'a> {
    tracker: &'a UsageTracker,
    key: String,
    limits: UsageLimits,
    held_tick: u64,
    previous_last_used: Option<u64>,
    day: NaiveDate,
    committed: bool,
}

impl Reservation<'_> {
    /// Keep the use. The cooldown runs from the tick of the commit.
    pub fn commit(mut self) {
        self.committed = true;
        if self.limits.has_cooldown() {
            let now = self.tracker.clock.now_ticks();
            let mut state = self.tracker.state.lock();
            state.last_used.insert(self.key.clone(), now.max(self.held_tick));
        }
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.tracker.release(self);
        }
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::with_system_clock()
    }
}

impl std::fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTracker")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use pretty_assertions::assert_eq;
    use std::sync::Barrier;
    use std::thread;

    fn tracker() -> (Arc<ManualClock>, UsageTracker) {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let clock = Arc::new(ManualClock::new(today));
        let tracker = UsageTracker::new(clock.clone());
        (clock, tracker)
    }

    #[test]
    fn test_cooldown() {
        let (clock, tracker) = tracker();
        let limits = UsageLimits::new(600, 0);

        assert!(tracker.check("Smite", &limits).is_ok());
        tracker.record("Smite", &limits);

        clock.advance(100);
        assert_eq!(
            tracker.check("Smite", &limits),
            Err(LimitViolation::Cooldown {
                remaining_ticks: 500
            })
        );

        clock.advance(500);
        assert!(tracker.check("Smite", &limits).is_ok());
    }

    #[test]
    fn test_daily_limit_and_rollover() {
        let (clock, tracker) = tracker();
        let limits = UsageLimits::new(0, 2);

        for _ in 0..2 {
            assert!(tracker.check("gift", &limits).is_ok());
            tracker.record("gift", &limits);
        }
        assert_eq!(
            tracker.check("gift", &limits),
            Err(LimitViolation::DailyLimit { limit: 2 })
        );

        clock.next_day();
        assert!(tracker.check("gift", &limits).is_ok());
        assert_eq!(tracker.snapshot("gift").used_today, 0);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let (_clock, tracker) = tracker();
        let limits = UsageLimits::new(10, 1);

        tracker.record("HealPawn", &limits);
        assert!(tracker.check("healpawn", &limits).is_err());
        assert_eq!(tracker.snapshot("HEALPAWN").used_today, 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let (_clock, tracker) = tracker();
        let limits = UsageLimits::new(10, 1);

        tracker.record("a", &limits);
        assert!(tracker.check("a", &limits).is_err());
        assert!(tracker.check("b", &limits).is_ok());
    }

    #[test]
    fn test_unlimited_records_nothing() {
        let (_clock, tracker) = tracker();
        let limits = UsageLimits::default();

        tracker.record("free", &limits);
        assert_eq!(tracker.snapshot("free"), UsageSnapshot::default());
    }

    #[test]
    fn test_forget_and_reset() {
        let (_clock, tracker) = tracker();
        let limits = UsageLimits::new(10, 1);

        tracker.record("a", &limits);
        tracker.record("b", &limits);

        tracker.forget("a");
        assert!(tracker.check("a", &limits).is_ok());
        assert!(tracker.check("b", &limits).is_err());

        tracker.reset();
        assert!(tracker.check("b", &limits).is_ok());
    }

    #[test]
    fn test_reservation_counts_until_released() {
        let (_clock, tracker) = tracker();
        let limits = UsageLimits::new(0, 1);

        let held = tracker.try_acquire("Gift", &limits).unwrap();
        assert_eq!(tracker.snapshot("gift").used_today, 1);
        assert_eq!(
            tracker.try_acquire("gift", &limits).unwrap_err(),
            LimitViolation::DailyLimit { limit: 1 }
        );

        drop(held);
        assert_eq!(tracker.snapshot("gift"), UsageSnapshot::default());

        tracker.try_acquire("gift", &limits).unwrap().commit();
        assert_eq!(tracker.snapshot("gift").used_today, 1);
        assert!(tracker.check("gift", &limits).is_err());
    }

    #[test]
    fn test_released_cooldown_restores_previous_use() {
        let (clock, tracker) = tracker();
        let limits = UsageLimits::new(100, 0);

        tracker.try_acquire("Smite", &limits).unwrap().commit();
        clock.advance(150);

        let held = tracker.try_acquire("Smite", &limits).unwrap();
        assert_eq!(tracker.snapshot("smite").last_used_tick, Some(150));
        drop(held);
        assert_eq!(tracker.snapshot("smite").last_used_tick, Some(0));
    }

    #[test]
    fn test_commit_starts_cooldown_at_commit_tick() {
        let (clock, tracker) = tracker();
        let limits = UsageLimits::new(100, 0);

        let held = tracker.try_acquire("Smite", &limits).unwrap();
        clock.advance(40);
        held.commit();

        assert_eq!(tracker.snapshot("smite").last_used_tick, Some(40));
        clock.advance(99);
        assert!(tracker.check("smite", &limits).is_err());
        clock.advance(1);
        assert!(tracker.check("smite", &limits).is_ok());
    }

    #[test]
    fn test_release_after_rollover_leaves_new_day_alone() {
        let (clock, tracker) = tracker();
        let limits = UsageLimits::new(0, 2);

        let held = tracker.try_acquire("gift", &limits).unwrap();
        clock.next_day();
        tracker.try_acquire("gift", &limits).unwrap().commit();
        drop(held);

        assert_eq!(tracker.snapshot("gift").used_today, 1);
    }

    #[test]
    fn test_concurrent_acquire_respects_daily_limit() {
        let (_clock, tracker) = tracker();
        let tracker = Arc::new(tracker);
        let limits = UsageLimits::new(0, 1);
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    match tracker.try_acquire("gift", &limits) {
                        Ok(held) => {
                            held.commit();
                            true
                        }
                        Err(_) => false,
                    }
                })
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|granted| *granted)
            .count();
        assert_eq!(granted, 1);
        assert_eq!(tracker.snapshot("gift").used_today, 1);
    }
}

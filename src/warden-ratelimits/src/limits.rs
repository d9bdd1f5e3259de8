//! Usage limit types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Limits applied to one action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLimits {
    /// Minimum ticks between two successful uses. Zero disables the cooldown.
    #[serde(default)]
    pub cooldown_ticks: u64,
    /// Successful uses allowed per calendar day. Zero means unlimited.
    #[serde(default)]
    pub daily_limit: u32,
}

impl UsageLimits {
    pub fn new(cooldown_ticks: u64, daily_limit: u32) -> Self {
        Self {
            cooldown_ticks,
            daily_limit,
        }
    }

    /// Check if a cooldown is configured.
    pub fn has_cooldown(&self) -> bool {
        self.cooldown_ticks > 0
    }

    /// Check if a daily cap is configured.
    pub fn has_daily_limit(&self) -> bool {
        self.daily_limit > 0
    }

    /// Check if neither limit applies.
    pub fn is_unlimited(&self) -> bool {
        !self.has_cooldown() && !self.has_daily_limit()
    }
}

/// Reason a use was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimitViolation {
    /// The action was used too recently.
    #[error("Command on cooldown. {remaining_ticks} ticks remaining")]
    Cooldown { remaining_ticks: u64 },

    /// Today's uses are exhausted.
    #[error("Daily limit reached ({limit} uses)")]
    DailyLimit { limit: u32 },
}

/// Usage recorded for one action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Successful uses since the last day rollover.
    pub used_today: u32,
    /// Tick of the last successful use, if any was recorded.
    pub last_used_tick: Option<u64>,
}

impl UsageSnapshot {
    /// Ticks left before the cooldown expires (zero when ready).
    pub fn cooldown_remaining(&self, limits: &UsageLimits, now_tick: u64) -> u64 {
        match self.last_used_tick {
            Some(last) if limits.has_cooldown() => {
                let elapsed = now_tick.saturating_sub(last);
                limits.cooldown_ticks.saturating_sub(elapsed)
            }
            _ => 0,
        }
    }

    /// Uses left today, or `None` when there is no daily cap.
    pub fn uses_remaining(&self, limits: &UsageLimits) -> Option<u32> {
        limits
            .has_daily_limit()
            .then(|| limits.daily_limit.saturating_sub(self.used_today))
    }
}

//! Usage limit display formatting.

use crate::limits::{UsageLimits, UsageSnapshot};

/// Format the limit status of one action for display.
pub fn format_usage(limits: &UsageLimits, usage: &UsageSnapshot, now_tick: u64) -> Vec<String> {
    let mut lines = Vec::new();

    if limits.has_cooldown() {
        let remaining = usage.cooldown_remaining(limits, now_tick);
        if remaining > 0 {
            lines.push(format!(
                "Cooldown: {} [{} of {} ticks remaining]",
                create_bar(remaining, limits.cooldown_ticks, 20),
                remaining,
                limits.cooldown_ticks
            ));
        } else {
            lines.push(format!("Cooldown: ready ({} ticks)", limits.cooldown_ticks));
        }
    }

    if limits.has_daily_limit() {
        lines.push(format!(
            "Daily:    {} [{}/{} used]",
            create_bar(
                u64::from(usage.used_today),
                u64::from(limits.daily_limit),
                20
            ),
            usage.used_today,
            limits.daily_limit
        ));
    }

    if lines.is_empty() {
        lines.push("No usage limits".to_string());
    }

    lines
}

/// Format the limit status as a single line for status output.
pub fn format_usage_compact(limits: &UsageLimits, usage: &UsageSnapshot, now_tick: u64) -> String {
    let mut parts = Vec::new();

    if limits.has_cooldown() {
        match usage.cooldown_remaining(limits, now_tick) {
            0 => parts.push("CD:ready".to_string()),
            remaining => parts.push(format!("CD:{remaining}t")),
        }
    }

    if limits.has_daily_limit() {
        parts.push(format!("D:{}/{}", usage.used_today, limits.daily_limit));
    }

    if parts.is_empty() {
        "unlimited".to_string()
    } else {
        parts.join(" | ")
    }
}

/// Create a progress bar filled in proportion to `value / total`.
fn create_bar(value: u64, total: u64, width: usize) -> String {
    let ratio = if total == 0 {
        0.0
    } else {
        (value as f64 / total as f64).clamp(0.0, 1.0)
    };
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_bar() {
        let bar = create_bar(5, 10, 10);
        assert_eq!(bar.chars().count(), 12); // 10 chars + 2 brackets
        assert_eq!(create_bar(3, 0, 4), "[░░░░]");
    }

    #[test]
    fn test_format_usage_ready() {
        let limits = UsageLimits::new(600, 3);
        let usage = UsageSnapshot {
            used_today: 1,
            last_used_tick: Some(0),
        };

        let lines = format_usage(&limits, &usage, 1_000);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Cooldown: ready (600 ticks)");
        assert!(lines[1].ends_with("[1/3 used]"));
    }

    #[test]
    fn test_format_usage_unlimited() {
        let lines = format_usage(&UsageLimits::default(), &UsageSnapshot::default(), 0);
        assert_eq!(lines, vec!["No usage limits".to_string()]);
    }

    #[test]
    fn test_format_usage_compact() {
        let limits = UsageLimits::new(600, 2);
        let usage = UsageSnapshot {
            used_today: 2,
            last_used_tick: Some(100),
        };

        assert_eq!(format_usage_compact(&limits, &usage, 400), "CD:300t | D:2/2");
        assert_eq!(
            format_usage_compact(&UsageLimits::default(), &usage, 400),
            "unlimited"
        );
    }
}

//! Consecutive-day activity streaks.
//!
//! Day deltas are whole calendar days between local dates, never elapsed
//! hours: activity at 23:59 and again at 00:01 is a one-day step.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub streak_days: u32,
    /// True when `today` is a different calendar day than the last activity.
    pub is_new_day: bool,
}

/// Compute the streak after activity on `today`.
///
/// A `today` earlier than `last_activity` (a backdated event) is treated like
/// same-day activity: the streak is left alone.
#[must_use]
pub fn advance(last_activity: Option<NaiveDate>, current: u32, today: NaiveDate) -> StreakUpdate {
    let Some(last) = last_activity else {
        return StreakUpdate {
            streak_days: 1,
            is_new_day: true,
        };
    };
    match (today - last).num_days() {
        i64::MIN..=0 => StreakUpdate {
            streak_days: current,
            is_new_day: false,
        },
        1 => StreakUpdate {
            streak_days: current.saturating_add(1),
            is_new_day: true,
        },
        _ => StreakUpdate {
            streak_days: 1,
            is_new_day: true,
        },
    }
}

//! The per-user progression aggregate and its append-only log rows.

use super::badge::BadgeKey;
use super::boss::BossResult;
use super::grow::GrowSet;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One rep's progression state.
///
/// `total_xp` never decreases and `current_level` is always the level table
/// applied to `total_xp`. The `GrowSet` collections only ever grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgression {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    pub total_xp: i64,
    pub current_level: u32,
    pub rank: String,
    #[serde(default)]
    pub closed_deals: u32,
    #[serde(default)]
    pub badges: GrowSet<BadgeKey>,
    #[serde(default)]
    pub streak_days: u32,
    #[serde(default)]
    pub last_activity_date: Option<NaiveDate>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub defeated_bosses: GrowSet<String>,
    #[serde(default)]
    pub passed_exams: GrowSet<String>,
    #[serde(default)]
    pub titles: GrowSet<String>,
    #[serde(default)]
    pub active_title: Option<String>,
    #[serde(default)]
    pub completed_modules: GrowSet<String>,
    #[serde(default)]
    pub mentee_count: u32,
    #[serde(default)]
    pub boss_attempts: BTreeMap<String, u32>,
    #[serde(default)]
    pub graduation_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProgression {
    /// First-touch defaults: level 1, zero counters, the first catalog rank.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        rank: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            total_xp: 0,
            current_level: 1,
            rank: rank.into(),
            closed_deals: 0,
            badges: GrowSet::new(),
            streak_days: 0,
            last_activity_date: None,
            specialization: None,
            defeated_bosses: GrowSet::new(),
            passed_exams: GrowSet::new(),
            titles: GrowSet::new(),
            active_title: None,
            completed_modules: GrowSet::new(),
            mentee_count: 0,
            boss_attempts: BTreeMap::new(),
            graduation_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn has_badge(&self, key: &BadgeKey) -> bool {
        self.badges.contains(key)
    }

    /// Highest tier held for `badge_id`, if any.
    #[must_use]
    pub fn best_tier(&self, badge_id: &str) -> Option<super::badge::BadgeTier> {
        self.badges
            .iter()
            .filter(|key| key.badge_id == badge_id)
            .map(|key| key.tier)
            .max()
    }

    #[must_use]
    pub fn attempts_for(&self, boss_id: &str) -> u32 {
        self.boss_attempts.get(boss_id).copied().unwrap_or(0)
    }
}

/// One row of the XP ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpEvent {
    pub id: i64,
    pub user_id: String,
    pub event_type: String,
    pub xp_amount: i64,
    /// Every factor applied, in application order. The specialization factor
    /// is stored under `"specialization"`.
    pub multipliers: BTreeMap<String, f64>,
    pub created_at: DateTime<Utc>,
}

/// Denormalized audit row for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub user_id: String,
    pub action: String,
    pub details: String,
    pub xp_earned: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossHistoryEntry {
    pub id: i64,
    pub user_id: String,
    pub boss_id: String,
    pub result: BossResult,
    pub created_at: DateTime<Utc>,
}

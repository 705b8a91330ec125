//! Boss battles: one-time reward bundles and unlimited attempts.

use crate::badges;
use crate::config::Catalog;
use crate::db::Mutation;
use crate::ledger::{self, XpOutcome, XpRequest};
use crate::model::boss::{BossResult, BossRewards};
use crate::model::progression::UserProgression;
use crate::notify::Notification;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Event type recorded on the ledger row for a boss reward.
pub const BOSS_REWARD_EVENT: &str = "boss_defeated";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BossDefeat {
    /// First defeat: rewards issued.
    Rewarded { rewards: BossRewards, xp: XpOutcome },
    /// Already beaten before; nothing changed.
    AlreadyDefeated,
    UnknownBoss,
}

/// Level gate for challenging a boss. Unknown bosses are never unlocked.
#[must_use]
pub fn is_unlocked(catalog: &Catalog, progression: &UserProgression, boss_id: &str) -> bool {
    catalog.boss(boss_id).is_some_and(|boss| {
        catalog.levels().level_for(progression.total_xp) >= boss.unlock_level
    })
}

/// Record a victory. Rewards are issued exactly once per boss: a repeat
/// defeat is a logged no-op.
///
/// # Errors
///
/// Returns an error if a log row cannot be written.
pub fn defeat(
    mutation: &mut Mutation<'_>,
    catalog: &Catalog,
    boss_id: &str,
    at: DateTime<Utc>,
    today: NaiveDate,
) -> Result<BossDefeat> {
    let user_id = mutation.progression().user_id.clone();
    let Some(boss) = catalog.boss(boss_id) else {
        warn!(user_id = %user_id, boss_id, "defeat reported for unknown boss");
        return Ok(BossDefeat::UnknownBoss);
    };

    if mutation.progression().defeated_bosses.contains(boss_id) {
        info!(user_id = %user_id, boss_id, "boss already defeated; no duplicate rewards");
        return Ok(BossDefeat::AlreadyDefeated);
    }

    let rewards = boss.rewards.clone();
    let progression = mutation.progression_mut();
    progression.defeated_bosses.insert(boss.id.clone());
    let badge_added = badges::award(&mut progression.badges, rewards.badge.clone());
    progression.titles.insert(rewards.title.clone());

    if badge_added {
        mutation.notify(Notification::BadgeUnlock {
            user_id: user_id.clone(),
            badge_id: rewards.badge.clone(),
        });
    }

    let details = format!("Defeated {}", boss.name);
    let xp = ledger::append_event(
        mutation,
        catalog,
        &XpRequest {
            event_type: BOSS_REWARD_EVENT,
            amount: Some(rewards.xp),
            multipliers: &[],
            details: Some(&details),
            occurred_at: at,
            today,
        },
    )?;
    mutation.append_boss_history(&boss.id, BossResult::Victory, at)?;

    info!(user_id = %user_id, boss_id, xp = xp.xp_earned, "boss defeated");
    mutation.notify(Notification::BossDefeated {
        user_id,
        boss: boss.id.clone(),
        boss_name: boss.name.clone(),
        rewards: rewards.clone(),
    });

    Ok(BossDefeat::Rewarded { rewards, xp })
}

/// Record a lost attempt and return the new attempt count, or `None` for an
/// unknown boss. Attempts are never limited.
///
/// # Errors
///
/// Returns an error if the history row cannot be written.
pub fn record_attempt(
    mutation: &mut Mutation<'_>,
    catalog: &Catalog,
    boss_id: &str,
    at: DateTime<Utc>,
) -> Result<Option<u32>> {
    if catalog.boss(boss_id).is_none() {
        warn!(user_id = %mutation.progression().user_id, boss_id, "attempt reported for unknown boss");
        return Ok(None);
    }
    let attempts = mutation
        .progression_mut()
        .boss_attempts
        .entry(boss_id.to_string())
        .or_insert(0);
    *attempts = attempts.saturating_add(1);
    let count = *attempts;
    mutation.append_boss_history(boss_id, BossResult::Defeat, at)?;
    Ok(Some(count))
}

//! Badge tier evaluation and append-only awarding.

use crate::model::badge::{BadgeDefinition, BadgeKey, BadgeRule, BadgeTier};
use crate::model::grow::GrowSet;
use std::collections::{BTreeMap, BTreeSet};

/// Named numeric facts a badge rule can test, plus the structural facts
/// (defeated bosses) boss-gated badges need.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSnapshot {
    values: BTreeMap<String, f64>,
    defeated_bosses: BTreeSet<String>,
}

impl MetricSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.set(metric, value);
        self
    }

    pub fn set(&mut self, metric: impl Into<String>, value: f64) {
        self.values.insert(metric.into(), value);
    }

    pub fn mark_boss_defeated(&mut self, boss_id: impl Into<String>) {
        self.defeated_bosses.insert(boss_id.into());
    }

    #[must_use]
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }

    #[must_use]
    pub fn boss_defeated(&self, boss_id: &str) -> bool {
        self.defeated_bosses.contains(boss_id)
    }

    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }
}

/// Whether one tier rule holds. A metric missing from the snapshot fails
/// every rule that reads it.
#[must_use]
pub fn rule_satisfied(rule: &BadgeRule, snapshot: &MetricSnapshot) -> bool {
    match rule {
        BadgeRule::Threshold {
            metric,
            comparison,
            threshold,
        } => snapshot
            .get(metric)
            .is_some_and(|value| comparison.passes(value, *threshold)),
        BadgeRule::Compound { min, max } => {
            min.iter()
                .all(|(field, bound)| snapshot.get(field).is_some_and(|v| v >= *bound))
                && max
                    .iter()
                    .all(|(field, bound)| snapshot.get(field).is_some_and(|v| v <= *bound))
        }
        BadgeRule::BossDefeated { boss } => snapshot.boss_defeated(boss),
    }
}

/// Highest satisfied tier for one badge.
#[must_use]
pub fn highest_tier(badge: &BadgeDefinition, snapshot: &MetricSnapshot) -> Option<BadgeTier> {
    badge
        .tiers
        .iter()
        .filter(|(_, rule)| rule_satisfied(rule, snapshot))
        .map(|(tier, _)| tier)
        .max()
}

/// Highest satisfied tier for every badge that has one.
#[must_use]
pub fn evaluate(badges: &[BadgeDefinition], snapshot: &MetricSnapshot) -> BTreeMap<String, BadgeTier> {
    badges
        .iter()
        .filter_map(|badge| highest_tier(badge, snapshot).map(|tier| (badge.id.clone(), tier)))
        .collect()
}

/// Add a badge to the held set unless it, or a higher tier of the same badge,
/// is already held. Returns `true` when the set grew.
///
/// Nothing is ever removed: a regressed metric cannot take a badge away and a
/// lower tier arriving after a higher one is ignored.
pub fn award(held: &mut GrowSet<BadgeKey>, key: BadgeKey) -> bool {
    let outranked = held
        .iter()
        .any(|existing| existing.badge_id == key.badge_id && existing.tier >= key.tier);
    if outranked {
        return false;
    }
    held.insert(key)
}

/// Evaluate and award in one pass; returns the keys that were newly added.
pub fn award_evaluated(
    held: &mut GrowSet<BadgeKey>,
    badges: &[BadgeDefinition],
    snapshot: &MetricSnapshot,
) -> Vec<BadgeKey> {
    evaluate(badges, snapshot)
        .into_iter()
        .map(|(badge_id, tier)| BadgeKey::new(badge_id, tier))
        .filter(|key| award(held, key.clone()))
        .collect()
}

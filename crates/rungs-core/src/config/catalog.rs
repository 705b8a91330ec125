//! The rule catalog: level table, event vocabulary, specializations, badges,
//! ranks and bosses.
//!
//! Everything here is static data. The built-in catalog is compiled in from
//! `catalog/default.toml`; a user catalog replaces it wholesale.

use crate::error::ErrorCode;
use crate::event::{EventDefinition, EventVocabulary};
use crate::level::LevelTable;
use crate::model::badge::BadgeDefinition;
use crate::model::boss::BossDefinition;
use crate::model::rank::RankDefinition;
use crate::model::specialization::SpecializationDefinition;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

const BUILTIN_CATALOG: &str = include_str!("../../catalog/default.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid level thresholds: {0}")]
    InvalidThresholds(String),
    #[error("alias '{alias}' points at unknown event type '{target}'")]
    DanglingAlias { alias: String, target: String },
    #[error("specialization '{specialization}' boosts unknown event type '{source_key}'")]
    DanglingBonus {
        specialization: String,
        source_key: String,
    },
    #[error("duplicate {kind} id '{id}'")]
    Duplicate { kind: &'static str, id: String },
    #[error("catalog defines no ranks")]
    NoRanks,
    #[error("streak bonus source '{0}' is not in the event vocabulary")]
    MissingStreakSource(String),
    #[error("boss '{boss}' rewards undefined badge '{badge}'")]
    UnknownRewardBadge { boss: String, badge: String },
}

impl CatalogError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidCatalog
    }
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    levels: RawLevels,
    streak: RawStreak,
    events: Vec<EventDefinition>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    #[serde(default)]
    specializations: Vec<SpecializationDefinition>,
    #[serde(default)]
    badges: Vec<BadgeDefinition>,
    ranks: Vec<RankDefinition>,
    #[serde(default)]
    bosses: Vec<BossDefinition>,
}

#[derive(Debug, Deserialize)]
struct RawLevels {
    thresholds: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct RawStreak {
    bonus_source: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    levels: LevelTable,
    vocabulary: EventVocabulary,
    streak_bonus_source: String,
    specializations: Vec<SpecializationDefinition>,
    badges: Vec<BadgeDefinition>,
    ranks: Vec<RankDefinition>,
    bosses: Vec<BossDefinition>,
}

impl Catalog {
    /// The catalog shipped with the crate.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded data file is broken.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] for malformed TOML or data that breaks a
    /// catalog rule (see the variants).
    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = toml::from_str(source)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawCatalog) -> Result<Self, CatalogError> {
        let levels = LevelTable::new(raw.levels.thresholds)?;

        ensure_unique("event", raw.events.iter().map(|e| e.key.as_str()))?;
        ensure_unique("rank", raw.ranks.iter().map(|r| r.id.as_str()))?;
        ensure_unique("badge", raw.badges.iter().map(|b| b.id.as_str()))?;
        ensure_unique("boss", raw.bosses.iter().map(|b| b.id.as_str()))?;
        ensure_unique(
            "specialization",
            raw.specializations.iter().map(|s| s.id.as_str()),
        )?;

        if raw.ranks.is_empty() {
            return Err(CatalogError::NoRanks);
        }

        let vocabulary = EventVocabulary::new(raw.events, raw.aliases);
        for (alias, target) in vocabulary.aliases() {
            if vocabulary.get(target).is_none() {
                return Err(CatalogError::DanglingAlias {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }

        for spec in &raw.specializations {
            for bonus in &spec.bonuses {
                if vocabulary.resolve(&bonus.source).is_err() {
                    return Err(CatalogError::DanglingBonus {
                        specialization: spec.id.clone(),
                        source_key: bonus.source.clone(),
                    });
                }
            }
        }

        let streak_bonus_source = vocabulary.canonical(&raw.streak.bonus_source).to_string();
        if vocabulary.get(&streak_bonus_source).is_none() {
            return Err(CatalogError::MissingStreakSource(raw.streak.bonus_source));
        }

        for boss in &raw.bosses {
            let reward = &boss.rewards.badge;
            let defined = raw
                .badges
                .iter()
                .find(|badge| badge.id == reward.badge_id)
                .is_some_and(|badge| badge.tiers.get(reward.tier).is_some());
            if !defined {
                return Err(CatalogError::UnknownRewardBadge {
                    boss: boss.id.clone(),
                    badge: reward.to_string(),
                });
            }
        }

        Ok(Self {
            levels,
            vocabulary,
            streak_bonus_source,
            specializations: raw.specializations,
            badges: raw.badges,
            ranks: raw.ranks,
            bosses: raw.bosses,
        })
    }

    #[must_use]
    pub const fn levels(&self) -> &LevelTable {
        &self.levels
    }

    #[must_use]
    pub const fn vocabulary(&self) -> &EventVocabulary {
        &self.vocabulary
    }

    /// Canonical event key whose base XP is the daily streak bonus.
    #[must_use]
    pub fn streak_bonus_source(&self) -> &str {
        &self.streak_bonus_source
    }

    /// XP added on a new day that extends a streak past one.
    #[must_use]
    pub fn streak_bonus(&self) -> i64 {
        self.vocabulary
            .get(&self.streak_bonus_source)
            .map_or(0, |entry| entry.base_xp)
    }

    #[must_use]
    pub fn specializations(&self) -> &[SpecializationDefinition] {
        &self.specializations
    }

    #[must_use]
    pub fn specialization(&self, id: &str) -> Option<&SpecializationDefinition> {
        self.specializations.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn badges(&self) -> &[BadgeDefinition] {
        &self.badges
    }

    #[must_use]
    pub fn badge(&self, id: &str) -> Option<&BadgeDefinition> {
        self.badges.iter().find(|b| b.id == id)
    }

    /// Ranks in promotion order.
    #[must_use]
    pub fn ranks(&self) -> &[RankDefinition] {
        &self.ranks
    }

    #[must_use]
    pub fn rank(&self, id: &str) -> Option<&RankDefinition> {
        self.ranks.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn rank_index(&self, id: &str) -> Option<usize> {
        self.ranks.iter().position(|r| r.id == id)
    }

    /// Rank every new rep starts at. Validation guarantees one exists.
    #[must_use]
    pub fn first_rank(&self) -> &RankDefinition {
        &self.ranks[0]
    }

    /// The single rank reachable from `id`, or `None` at the terminal rank or
    /// for an unknown id.
    #[must_use]
    pub fn next_rank(&self, id: &str) -> Option<&RankDefinition> {
        self.rank_index(id).and_then(|idx| self.ranks.get(idx + 1))
    }

    #[must_use]
    pub fn bosses(&self) -> &[BossDefinition] {
        &self.bosses
    }

    #[must_use]
    pub fn boss(&self, id: &str) -> Option<&BossDefinition> {
        self.bosses.iter().find(|b| b.id == id)
    }
}

fn ensure_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::Duplicate {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// Load a catalog file, or the built-in catalog when `path` is `None`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let Some(path) = path else {
        return Catalog::builtin().context("built-in catalog is invalid");
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;

    Catalog::from_toml_str(&content)
        .with_context(|| format!("Failed to load catalog {}", path.display()))
}

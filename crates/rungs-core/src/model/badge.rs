use super::ParseEnumError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

/// The four badge tiers, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl BadgeTier {
    /// All tiers in ascending order.
    pub const ALL: [Self; 4] = [Self::Bronze, Self::Silver, Self::Gold, Self::Platinum];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }

    /// Capitalized form used in eligibility messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
        }
    }
}

impl fmt::Display for BadgeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadgeTier {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            "platinum" => Ok(Self::Platinum),
            _ => Err(ParseEnumError::new("badge tier", s)),
        }
    }
}

/// A held badge: `<badge_id>.<tier>`, e.g. `opener_elite.silver`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BadgeKey {
    pub badge_id: String,
    pub tier: BadgeTier,
}

impl BadgeKey {
    #[must_use]
    pub fn new(badge_id: impl Into<String>, tier: BadgeTier) -> Self {
        Self {
            badge_id: badge_id.into(),
            tier,
        }
    }
}

impl fmt::Display for BadgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.badge_id, self.tier)
    }
}

impl FromStr for BadgeKey {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (badge_id, tier) = s
            .rsplit_once('.')
            .ok_or_else(|| ParseEnumError::new("badge key (id.tier)", s))?;
        if badge_id.trim().is_empty() {
            return Err(ParseEnumError::new("badge key (id.tier)", s));
        }
        Ok(Self {
            badge_id: badge_id.to_string(),
            tier: tier.parse()?,
        })
    }
}

impl TryFrom<String> for BadgeKey {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BadgeKey> for String {
    fn from(key: BadgeKey) -> Self {
        key.to_string()
    }
}

/// Direction of a threshold comparison.
///
/// Both directions are inclusive: `less_than` passes when the metric is at or
/// below the threshold, `greater_than` when it is at or above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    LessThan,
    #[default]
    GreaterThan,
}

impl Comparison {
    #[must_use]
    pub fn passes(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::LessThan => value <= threshold,
            Self::GreaterThan => value >= threshold,
        }
    }

    /// Word used in human-readable requirement messages.
    #[must_use]
    pub const fn direction(self) -> &'static str {
        match self {
            Self::LessThan => "below",
            Self::GreaterThan => "above",
        }
    }
}

/// Rule a single badge tier must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BadgeRule {
    /// One metric compared against one threshold.
    Threshold {
        metric: String,
        comparison: Comparison,
        threshold: f64,
    },
    /// Several named fields that must all hold: every `min` entry as a lower
    /// bound and every `max` entry as an upper bound.
    Compound {
        #[serde(default)]
        min: BTreeMap<String, f64>,
        #[serde(default)]
        max: BTreeMap<String, f64>,
    },
    /// A structural fact: the named boss has been defeated.
    BossDefeated { boss: String },
}

/// Per-tier rules of one badge. Tiers a badge does not offer stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BadgeTiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bronze: Option<BadgeRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silver: Option<BadgeRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold: Option<BadgeRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platinum: Option<BadgeRule>,
}

impl BadgeTiers {
    #[must_use]
    pub const fn get(&self, tier: BadgeTier) -> Option<&BadgeRule> {
        match tier {
            BadgeTier::Bronze => self.bronze.as_ref(),
            BadgeTier::Silver => self.silver.as_ref(),
            BadgeTier::Gold => self.gold.as_ref(),
            BadgeTier::Platinum => self.platinum.as_ref(),
        }
    }

    /// Defined tiers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (BadgeTier, &BadgeRule)> {
        BadgeTier::ALL
            .into_iter()
            .filter_map(|tier| self.get(tier).map(|rule| (tier, rule)))
    }
}

/// Grouping used by displays; carries no evaluation semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeCategory {
    Efficiency,
    #[default]
    Performance,
    Streaks,
    Special,
    Communication,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: BadgeCategory,
    pub tiers: BadgeTiers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_ordered() {
        assert!(BadgeTier::Bronze < BadgeTier::Silver);
        assert!(BadgeTier::Gold < BadgeTier::Platinum);
        assert_eq!(BadgeTier::ALL.iter().max(), Some(&BadgeTier::Platinum));
    }

    #[test]
    fn badge_key_parses_last_dot() {
        let key: BadgeKey = "opener_elite.silver".parse().expect("valid key");
        assert_eq!(key.badge_id, "opener_elite");
        assert_eq!(key.tier, BadgeTier::Silver);
        assert_eq!(key.to_string(), "opener_elite.silver");
    }

    #[test]
    fn badge_key_rejects_missing_tier() {
        assert!("redhawk_slayer".parse::<BadgeKey>().is_err());
        assert!("closer.diamond".parse::<BadgeKey>().is_err());
        assert!(".gold".parse::<BadgeKey>().is_err());
    }

    #[test]
    fn badge_key_serializes_as_string() {
        let key = BadgeKey::new("closer", BadgeTier::Gold);
        let json = serde_json::to_string(&key).expect("serialize");
        assert_eq!(json, r#""closer.gold""#);
        let back: BadgeKey = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, key);
    }

    #[test]
    fn comparison_is_inclusive_both_ways() {
        assert!(Comparison::LessThan.passes(0.50, 0.50));
        assert!(!Comparison::LessThan.passes(0.51, 0.50));
        assert!(Comparison::GreaterThan.passes(0.05, 0.05));
        assert!(!Comparison::GreaterThan.passes(0.04, 0.05));
    }

    #[test]
    fn tiers_iterate_in_ascending_order() {
        let rule = BadgeRule::BossDefeated {
            boss: "redhawk".to_string(),
        };
        let tiers = BadgeTiers {
            platinum: Some(rule.clone()),
            bronze: Some(rule),
            ..BadgeTiers::default()
        };
        let order: Vec<BadgeTier> = tiers.iter().map(|(tier, _)| tier).collect();
        assert_eq!(order, vec![BadgeTier::Bronze, BadgeTier::Platinum]);
    }
}

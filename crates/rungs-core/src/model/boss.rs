use super::ParseEnumError;
use super::badge::BadgeKey;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub unlock_level: u32,
    #[serde(default)]
    pub required_for_rank: Option<String>,
    pub rewards: BossRewards,
}

/// One-time reward bundle issued on the first defeat of a boss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossRewards {
    pub xp: i64,
    pub badge: BadgeKey,
    pub title: String,
}

/// Outcome recorded in the boss history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BossResult {
    Victory,
    Defeat,
}

impl BossResult {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Victory => "victory",
            Self::Defeat => "defeat",
        }
    }
}

impl fmt::Display for BossResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BossResult {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "victory" => Ok(Self::Victory),
            "defeat" => Ok(Self::Defeat),
            _ => Err(ParseEnumError::new("boss result", s)),
        }
    }
}

use super::badge::{BadgeKey, Comparison};
use serde::{Deserialize, Serialize};

/// A career rank. Ranks form one total order: their position in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    pub grade: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: RankRequirements,
}

/// Everything that must hold before a rep can be promoted *into* a rank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankRequirements {
    pub min_level: u32,
    pub min_deals: u32,
    pub required_badges: Vec<BadgeKey>,
    pub required_modules: Vec<String>,
    pub efficiency: Option<EfficiencyRequirement>,
    pub boss_defeated: Option<String>,
    pub exam_passed: Option<String>,
    pub mentoring_required: Option<u32>,
    /// Manual, out-of-band certification; nothing in the engine satisfies it.
    pub leadership_certification: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyRequirement {
    pub metric: String,
    pub threshold: f64,
    #[serde(default)]
    pub comparison: Comparison,
}

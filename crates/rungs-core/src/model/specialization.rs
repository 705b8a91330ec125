use serde::{Deserialize, Serialize};

/// A multiplier profile a rep can choose once they reach `unlock_level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializationDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub unlock_level: u32,
    #[serde(default)]
    pub bonus_label: String,
    #[serde(default)]
    pub bonuses: Vec<SpecializationBonus>,
}

/// XP multiplier for one event type. `source` may be an alias; it is
/// canonicalized before matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecializationBonus {
    pub source: String,
    pub multiplier: f64,
}

//! Rank promotion gate.
//!
//! Only the single next rank is ever evaluated. Every requirement is checked
//! in a fixed order and every unmet one contributes a message, so a caller
//! sees the whole gap at once.

use crate::config::Catalog;
use crate::model::badge::BadgeKey;
use crate::model::grow::GrowSet;
use crate::model::humanize;
use crate::model::progression::UserProgression;
use serde::Serialize;
use std::collections::BTreeMap;

/// Message reported when the current rank has no successor.
pub const MAX_RANK_REACHED: &str = "Max rank reached";

/// Everything the gate reads.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityInput<'a> {
    pub current_rank: &'a str,
    pub level: u32,
    pub deals: u32,
    pub badges: &'a GrowSet<BadgeKey>,
    pub completed_modules: &'a GrowSet<String>,
    pub defeated_bosses: &'a GrowSet<String>,
    pub passed_exams: &'a GrowSet<String>,
    pub efficiency: &'a BTreeMap<String, f64>,
    pub mentee_count: u32,
}

impl<'a> EligibilityInput<'a> {
    /// Read the gate inputs off an aggregate. The level is recomputed from
    /// total XP rather than trusting the cached column.
    #[must_use]
    pub fn from_progression(
        catalog: &Catalog,
        progression: &'a UserProgression,
        efficiency: &'a BTreeMap<String, f64>,
    ) -> Self {
        Self {
            current_rank: &progression.rank,
            level: catalog.levels().level_for(progression.total_xp),
            deals: progression.closed_deals,
            badges: &progression.badges,
            completed_modules: &progression.completed_modules,
            defeated_bosses: &progression.defeated_bosses,
            passed_exams: &progression.passed_exams,
            efficiency,
            mentee_count: progression.mentee_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub current_rank: String,
    pub next_rank: Option<String>,
    pub missing: Vec<String>,
}

/// Check whether the rep may be promoted into the rank after
/// `input.current_rank`.
#[must_use]
pub fn check_eligibility(catalog: &Catalog, input: &EligibilityInput<'_>) -> Eligibility {
    let ineligible = |message: String| Eligibility {
        eligible: false,
        current_rank: input.current_rank.to_string(),
        next_rank: None,
        missing: vec![message],
    };

    if catalog.rank(input.current_rank).is_none() {
        return ineligible(format!("Unknown current rank '{}'", input.current_rank));
    }
    let Some(next) = catalog.next_rank(input.current_rank) else {
        return ineligible(MAX_RANK_REACHED.to_string());
    };

    let req = &next.requirements;
    let mut missing = Vec::new();

    if input.level < req.min_level {
        missing.push(format!(
            "Reach Level {} (currently {})",
            req.min_level, input.level
        ));
    }

    if input.deals < req.min_deals {
        missing.push(format!(
            "Close {} deals (currently {})",
            req.min_deals, input.deals
        ));
    }

    for required in &req.required_badges {
        let held = input
            .badges
            .iter()
            .any(|key| key.badge_id == required.badge_id && key.tier >= required.tier);
        if !held {
            missing.push(format!(
                "Earn {} {}",
                required.tier.label(),
                humanize(&required.badge_id)
            ));
        }
    }

    for module in &req.required_modules {
        if !input.completed_modules.contains(module.as_str()) {
            missing.push(format!("Complete {}", humanize(module)));
        }
    }

    if let Some(efficiency) = &req.efficiency {
        let passes = input
            .efficiency
            .get(&efficiency.metric)
            .is_some_and(|value| efficiency.comparison.passes(*value, efficiency.threshold));
        if !passes {
            missing.push(format!(
                "Get {} {} {:.0}%",
                humanize(&efficiency.metric),
                efficiency.comparison.direction(),
                efficiency.threshold * 100.0
            ));
        }
    }

    if let Some(boss_id) = &req.boss_defeated {
        if !input.defeated_bosses.contains(boss_id.as_str()) {
            let name = catalog.boss(boss_id).map_or(boss_id.as_str(), |b| b.name.as_str());
            missing.push(format!("Defeat {name} in battle"));
        }
    }

    if let Some(exam) = &req.exam_passed {
        if !input.passed_exams.contains(exam.as_str()) {
            missing.push(format!("Pass {} exam", humanize(exam)));
        }
    }

    if let Some(required) = req.mentoring_required {
        if input.mentee_count < required {
            missing.push(format!(
                "Mentor {required} reps (currently {})",
                input.mentee_count
            ));
        }
    }

    if req.leadership_certification {
        missing.push("Complete Leadership Certification".to_string());
    }

    Eligibility {
        eligible: missing.is_empty(),
        current_rank: input.current_rank.to_string(),
        next_rank: Some(next.id.clone()),
        missing,
    }
}

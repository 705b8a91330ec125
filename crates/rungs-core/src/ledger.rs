//! XP accrual.
//!
//! Computation is pure ([`compute`]); [`append_event`] applies a computation
//! to an open [`Mutation`] and writes the ledger and activity rows.

use crate::config::Catalog;
use crate::db::Mutation;
use crate::model::progression::UserProgression;
use crate::multiplier::multiplier_for;
use crate::notify::Notification;
use crate::streak::{self, StreakUpdate};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Key under which the specialization factor is recorded on each ledger row.
pub const SPECIALIZATION_MULTIPLIER: &str = "specialization";

/// One XP award request, already bound to a point in time.
#[derive(Debug, Clone)]
pub struct XpRequest<'a> {
    pub event_type: &'a str,
    pub amount: Option<i64>,
    pub multipliers: &'a [(String, f64)],
    pub details: Option<&'a str>,
    pub occurred_at: DateTime<Utc>,
    /// Local calendar date of `occurred_at`.
    pub today: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XpOutcome {
    pub xp_earned: i64,
    pub total_xp: i64,
    pub new_level: u32,
    pub leveled_up: bool,
    pub streak_days: u32,
}

impl XpOutcome {
    /// Nothing awarded; the aggregate is unchanged.
    #[must_use]
    pub const fn zero(progression: Option<&UserProgression>) -> Self {
        match progression {
            Some(p) => Self {
                xp_earned: 0,
                total_xp: p.total_xp,
                new_level: p.current_level,
                leveled_up: false,
                streak_days: p.streak_days,
            },
            None => Self {
                xp_earned: 0,
                total_xp: 0,
                new_level: 1,
                leveled_up: false,
                streak_days: 0,
            },
        }
    }
}

/// Fully resolved award, before it touches storage.
#[derive(Debug, Clone, PartialEq)]
pub struct XpComputation {
    /// Canonical event type after alias resolution.
    pub event_type: String,
    pub base: i64,
    pub specialization_multiplier: f64,
    pub streak: StreakUpdate,
    pub streak_bonus: i64,
    pub xp_earned: i64,
    pub multipliers: BTreeMap<String, f64>,
}

/// JavaScript-style `Math.round`: halves round toward positive infinity.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Resolve the base amount and apply every factor, rounding after each one.
/// Out-of-range results saturate at `i64::MAX`.
///
/// Returns `None` when the event type is unknown and no explicit amount was
/// given.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute(
    catalog: &Catalog,
    progression: &UserProgression,
    request: &XpRequest<'_>,
) -> Option<XpComputation> {
    let vocabulary = catalog.vocabulary();
    let event_type = vocabulary.canonical(request.event_type).to_string();
    let base = request
        .amount
        .or_else(|| vocabulary.get(&event_type).map(|entry| entry.base_xp))?;

    let specialization_multiplier =
        multiplier_for(catalog, progression.specialization.as_deref(), &event_type);
    let mut running = round_half_up(base as f64 * specialization_multiplier);
    for (_, factor) in request.multipliers {
        running = round_half_up(running as f64 * factor);
    }

    let streak = streak::advance(
        progression.last_activity_date,
        progression.streak_days,
        request.today,
    );
    let streak_bonus = if streak.is_new_day && streak.streak_days > 1 {
        catalog.streak_bonus()
    } else {
        0
    };
    running = running.saturating_add(streak_bonus);

    if running < 0 {
        warn!(
            user_id = %progression.user_id,
            event_type = %event_type,
            computed = running,
            "negative xp clamped to zero"
        );
        running = 0;
    }

    let mut multipliers: BTreeMap<String, f64> = request.multipliers.iter().cloned().collect();
    multipliers.insert(
        SPECIALIZATION_MULTIPLIER.to_string(),
        specialization_multiplier,
    );

    Some(XpComputation {
        event_type,
        base,
        specialization_multiplier,
        streak,
        streak_bonus,
        xp_earned: running,
        multipliers,
    })
}

/// Award XP inside an open mutation.
///
/// Unknown event types without an explicit amount are logged and leave the
/// aggregate untouched.
///
/// # Errors
///
/// Returns an error if a log row cannot be written.
pub fn append_event(
    mutation: &mut Mutation<'_>,
    catalog: &Catalog,
    request: &XpRequest<'_>,
) -> Result<XpOutcome> {
    let Some(computed) = compute(catalog, mutation.progression(), request) else {
        warn!(
            user_id = %mutation.progression().user_id,
            event_type = request.event_type,
            "unknown event type with no amount; awarding 0 xp"
        );
        return Ok(XpOutcome::zero(Some(mutation.progression())));
    };

    let levels = catalog.levels();
    let progression = mutation.progression_mut();
    let old_level = levels.level_for(progression.total_xp);
    let total_xp = progression.total_xp.saturating_add(computed.xp_earned);
    let new_level = levels.level_for(total_xp);
    let leveled_up = new_level > old_level;

    progression.total_xp = total_xp;
    progression.current_level = new_level;
    if computed.streak.is_new_day {
        progression.streak_days = computed.streak.streak_days;
        progression.last_activity_date = Some(request.today);
    }
    let streak_days = progression.streak_days;
    let user_id = progression.user_id.clone();

    let details = request.details.map_or_else(
        || {
            catalog
                .vocabulary()
                .get(&computed.event_type)
                .map_or_else(|| computed.event_type.clone(), |entry| entry.name.clone())
        },
        str::to_string,
    );

    mutation.append_xp_event(
        &computed.event_type,
        computed.xp_earned,
        &computed.multipliers,
        request.occurred_at,
    )?;
    mutation.append_activity(
        &computed.event_type,
        &details,
        computed.xp_earned,
        request.occurred_at,
    )?;

    if leveled_up {
        info!(user_id = %user_id, old_level, new_level, "level up");
        mutation.notify(Notification::LevelUp {
            user_id,
            old_level,
            new_level,
        });
    }

    Ok(XpOutcome {
        xp_earned: computed.xp_earned,
        total_xp,
        new_level,
        leveled_up,
        streak_days,
    })
}

//! Inbound events: what producers hand to the engine.

pub mod types;
pub mod vocabulary;

pub use types::{EventDefinition, InvalidMultiplier, UnknownEventType};
pub use vocabulary::EventVocabulary;

use crate::ledger::SPECIALIZATION_MULTIPLIER;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// A performance event reported by a producer (dialer, CRM hook, training
/// module, operator CLI).
///
/// `event_type` may be a canonical key or an alias. `amount` overrides the
/// vocabulary's base XP. `multipliers` are applied in insertion order after
/// the specialization factor.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub user_id: String,
    pub event_type: String,
    pub amount: Option<i64>,
    pub multipliers: Vec<(String, f64)>,
    pub details: Option<String>,
    /// Producer-supplied time of the event; the engine clock is used when
    /// absent.
    pub occurred_at: Option<DateTime<Utc>>,
}

impl InboundEvent {
    #[must_use]
    pub fn new(user_id: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            event_type: event_type.into(),
            amount: None,
            multipliers: Vec::new(),
            details: None,
            occurred_at: None,
        }
    }

    #[must_use]
    pub const fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn with_multiplier(mut self, name: impl Into<String>, factor: f64) -> Self {
        self.multipliers.push((name.into(), factor));
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    #[must_use]
    pub const fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    /// Check the caller's multipliers before anything is computed. Each name
    /// must be unique and not shadow the specialization factor, and each
    /// factor must be finite.
    ///
    /// # Errors
    ///
    /// Returns the first offending multiplier.
    pub fn validate(&self) -> Result<(), InvalidMultiplier> {
        let mut seen = HashSet::new();
        for (name, factor) in &self.multipliers {
            if !factor.is_finite() {
                return Err(InvalidMultiplier::NotFinite {
                    name: name.clone(),
                    factor: *factor,
                });
            }
            if name == SPECIALIZATION_MULTIPLIER {
                return Err(InvalidMultiplier::Reserved(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(InvalidMultiplier::Duplicate(name.clone()));
            }
        }
        Ok(())
    }
}

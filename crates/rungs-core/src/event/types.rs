//! Inbound event vocabulary entries.
//!
//! Event types are data, not code: the catalog lists every recognised key
//! together with its base XP and the daily counter it bumps.

use crate::error::ErrorCode;
use crate::model::metrics::DailyMetric;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One recognised inbound event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    /// Canonical key, e.g. `appointment_set`.
    pub key: String,
    /// Display name used in activity log rows.
    pub name: String,
    /// XP awarded when the producer does not supply an explicit amount.
    pub base_xp: i64,
    /// Daily counter incremented each time this event is ingested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_metric: Option<DailyMetric>,
}

/// Error returned when an event type is neither a vocabulary key nor an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType {
    /// The unrecognised input string.
    pub raw: String,
}

impl UnknownEventType {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::UnknownEventType
    }
}

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown event type '{}': not in the catalog vocabulary or alias table",
            self.raw
        )
    }
}

impl std::error::Error for UnknownEventType {}

/// Error returned when an inbound event carries a multiplier the ledger
/// cannot apply or record faithfully.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidMultiplier {
    #[error("multiplier '{name}' is not a finite number: {factor}")]
    NotFinite { name: String, factor: f64 },
    #[error("multiplier name '{0}' is reserved for the specialization factor")]
    Reserved(String),
    #[error("multiplier '{0}' given more than once")]
    Duplicate(String),
}

impl InvalidMultiplier {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidMultiplier
    }
}

//! Data model: the per-user aggregate, its append-only log records, and the
//! static catalog definitions (badges, ranks, bosses, specializations).

pub mod badge;
pub mod boss;
pub mod grow;
pub mod metrics;
pub mod progression;
pub mod rank;
pub mod specialization;

use crate::error::ErrorCode;

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected}: '{got}'")]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl ParseEnumError {
    pub(crate) fn new(expected: &'static str, got: &str) -> Self {
        Self {
            expected,
            got: got.to_string(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidEnumValue
    }
}

/// Turn an identifier like `opener_elite` into `opener elite` for messages.
pub(crate) fn humanize(id: &str) -> String {
    id.replace('_', " ")
}

use std::fmt;

/// Machine-readable error codes for operator- and agent-friendly decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InvalidCatalog,
    UnknownEventType,
    UnknownRank,
    UnknownBoss,
    UnknownSpecialization,
    UnknownTitle,
    InvalidEnumValue,
    InvalidMultiplier,
    StoreWriteFailed,
    CorruptAggregate,
    SyncFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidCatalog => "E1003",
            Self::UnknownEventType => "E2001",
            Self::UnknownRank => "E2002",
            Self::UnknownBoss => "E2003",
            Self::UnknownSpecialization => "E2004",
            Self::UnknownTitle => "E2005",
            Self::InvalidEnumValue => "E2006",
            Self::InvalidMultiplier => "E2007",
            Self::StoreWriteFailed => "E3001",
            Self::CorruptAggregate => "E3002",
            Self::SyncFailed => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Progression not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidCatalog => "Catalog failed validation",
            Self::UnknownEventType => "Unknown event type",
            Self::UnknownRank => "Unknown rank",
            Self::UnknownBoss => "Unknown boss",
            Self::UnknownSpecialization => "Unknown specialization",
            Self::UnknownTitle => "Title not earned",
            Self::InvalidEnumValue => "Invalid tier/result/comparison value",
            Self::InvalidMultiplier => "Invalid XP multiplier",
            Self::StoreWriteFailed => "Progression store write failed",
            Self::CorruptAggregate => "Corrupt progression snapshot",
            Self::SyncFailed => "External sync failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `rungs init <user>` to create the progression record."),
            Self::ConfigParseError => Some("Fix syntax in .rungs/config.toml and retry."),
            Self::InvalidCatalog => {
                Some("Check level thresholds, aliases and reward badges in the catalog file.")
            }
            Self::UnknownEventType => {
                Some("Use an event type from the catalog vocabulary or pass an explicit amount.")
            }
            Self::UnknownRank | Self::UnknownBoss | Self::UnknownSpecialization => {
                Some("List the catalog to see the configured ids.")
            }
            Self::UnknownTitle => Some("Titles are earned by defeating bosses."),
            Self::InvalidEnumValue => {
                Some("Use bronze/silver/gold/platinum, victory/defeat, less_than/greater_than.")
            }
            Self::InvalidMultiplier => Some(
                "Pass each multiplier once as a finite number; `specialization` is reserved.",
            ),
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::CorruptAggregate => Some("Restore the progression row from the sync mirror."),
            Self::SyncFailed => Some("Local state is kept; the next mutation retries the sync."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

//! SQLite schema for the progression store.
//!
//! - `progression` keeps one row per user: key columns for querying plus the
//!   full aggregate as `snapshot_json`
//! - `xp_events`, `activity_log` and `boss_history` are append-only logs,
//!   read newest-first
//! - `daily_metrics` holds per-user per-day counters (v2)
//! - `store_meta` mirrors the schema version

/// Migration v1: aggregate table, the three logs and store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS progression (
    user_id TEXT PRIMARY KEY CHECK (length(trim(user_id)) > 0),
    total_xp INTEGER NOT NULL DEFAULT 0 CHECK (total_xp >= 0),
    current_level INTEGER NOT NULL DEFAULT 1 CHECK (current_level >= 1),
    rank TEXT NOT NULL,
    snapshot_json TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS xp_events (
    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES progression(user_id) ON DELETE CASCADE,
    event_type TEXT NOT NULL CHECK (length(trim(event_type)) > 0),
    xp_amount INTEGER NOT NULL,
    multipliers_json TEXT NOT NULL DEFAULT '{}',
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS activity_log (
    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES progression(user_id) ON DELETE CASCADE,
    action TEXT NOT NULL,
    details TEXT NOT NULL DEFAULT '',
    xp_earned INTEGER NOT NULL DEFAULT 0,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS boss_history (
    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES progression(user_id) ON DELETE CASCADE,
    boss_id TEXT NOT NULL,
    result TEXT NOT NULL CHECK (result IN ('victory', 'defeat')),
    created_at_us INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_boss_history_single_victory
    ON boss_history(user_id, boss_id)
    WHERE result = 'victory';

CREATE INDEX IF NOT EXISTS idx_xp_events_user_created
    ON xp_events(user_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_activity_log_user_created
    ON activity_log(user_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_boss_history_user_created
    ON boss_history(user_id, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_progression_rank
    ON progression(rank);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 0);
";

/// Migration v2: per-day activity counters feeding efficiency metrics.
pub const MIGRATION_V2_SQL: &str = r"
CREATE TABLE IF NOT EXISTS daily_metrics (
    user_id TEXT NOT NULL REFERENCES progression(user_id) ON DELETE CASCADE,
    day TEXT NOT NULL CHECK (length(day) = 10),
    dials INTEGER NOT NULL DEFAULT 0,
    connects INTEGER NOT NULL DEFAULT 0,
    calls_under_30s INTEGER NOT NULL DEFAULT 0,
    calls_over_2min INTEGER NOT NULL DEFAULT 0,
    appointments INTEGER NOT NULL DEFAULT 0,
    shows INTEGER NOT NULL DEFAULT 0,
    deals INTEGER NOT NULL DEFAULT 0,
    sms_enrollments INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, day)
);

CREATE INDEX IF NOT EXISTS idx_daily_metrics_user_day
    ON daily_metrics(user_id, day DESC);
";

/// Indexes the store relies on; checked by migration tests.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_boss_history_single_victory",
    "idx_xp_events_user_created",
    "idx_activity_log_user_created",
    "idx_boss_history_user_created",
    "idx_progression_rank",
    "idx_daily_metrics_user_day",
];

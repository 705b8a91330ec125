//! Row-level reads and writes against the progression store.
//!
//! Every function takes a plain `&Connection` so it runs equally inside a
//! store transaction (`Transaction` derefs to `Connection`) or on a bare
//! read connection.

use crate::model::boss::BossResult;
use crate::model::metrics::{DailyMetric, DailyMetrics};
use crate::model::progression::{ActivityLogEntry, BossHistoryEntry, UserProgression, XpEvent};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeMap;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Fetch a user's aggregate.
///
/// Returns `None` if the user has never been initialized.
///
/// # Errors
///
/// Returns an error if the query fails or the snapshot cannot be decoded.
pub fn load_progression(conn: &Connection, user_id: &str) -> Result<Option<UserProgression>> {
    let snapshot: Option<String> = conn
        .query_row(
            "SELECT snapshot_json FROM progression WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("load progression for '{user_id}'"))?;

    snapshot
        .map(|json| {
            serde_json::from_str(&json)
                .with_context(|| format!("decode progression snapshot for '{user_id}'"))
        })
        .transpose()
}

/// Insert a fresh aggregate. Returns `false` if the user already exists.
///
/// # Errors
///
/// Returns an error if serialization or the insert fails.
pub fn insert_progression(conn: &Connection, progression: &UserProgression) -> Result<bool> {
    let snapshot = serde_json::to_string(progression).context("encode progression snapshot")?;
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO progression (
                user_id, total_xp, current_level, rank, snapshot_json,
                created_at_us, updated_at_us
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                progression.user_id,
                progression.total_xp,
                progression.current_level,
                progression.rank,
                snapshot,
                progression.created_at.timestamp_micros(),
                progression.updated_at.timestamp_micros(),
            ],
        )
        .with_context(|| format!("insert progression for '{}'", progression.user_id))?;
    Ok(inserted == 1)
}

/// Overwrite an existing aggregate.
///
/// # Errors
///
/// Returns an error if serialization or the update fails.
pub fn save_progression(conn: &Connection, progression: &UserProgression) -> Result<()> {
    let snapshot = serde_json::to_string(progression).context("encode progression snapshot")?;
    conn.execute(
        "UPDATE progression
         SET total_xp = ?2, current_level = ?3, rank = ?4, snapshot_json = ?5, updated_at_us = ?6
         WHERE user_id = ?1",
        params![
            progression.user_id,
            progression.total_xp,
            progression.current_level,
            progression.rank,
            snapshot,
            progression.updated_at.timestamp_micros(),
        ],
    )
    .with_context(|| format!("save progression for '{}'", progression.user_id))?;
    Ok(())
}

/// All initialized user ids, sorted.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_users(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT user_id FROM progression ORDER BY user_id")
        .context("prepare list_users")?;
    let rows = stmt
        .query_map([], |row| row.get(0))
        .context("execute list_users")?;
    let mut users = Vec::new();
    for row in rows {
        users.push(row.context("read user row")?);
    }
    Ok(users)
}

/// Append one XP ledger row and return its id.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn append_xp_event(
    conn: &Connection,
    user_id: &str,
    event_type: &str,
    xp_amount: i64,
    multipliers: &BTreeMap<String, f64>,
    at: DateTime<Utc>,
) -> Result<i64> {
    let multipliers_json = serde_json::to_string(multipliers).context("encode multipliers")?;
    conn.execute(
        "INSERT INTO xp_events (user_id, event_type, xp_amount, multipliers_json, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, event_type, xp_amount, multipliers_json, at.timestamp_micros()],
    )
    .with_context(|| format!("append xp event '{event_type}' for '{user_id}'"))?;
    Ok(conn.last_insert_rowid())
}

/// Append one activity log row and return its id.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn append_activity(
    conn: &Connection,
    user_id: &str,
    action: &str,
    details: &str,
    xp_earned: i64,
    at: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO activity_log (user_id, action, details, xp_earned, created_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, action, details, xp_earned, at.timestamp_micros()],
    )
    .with_context(|| format!("append activity '{action}' for '{user_id}'"))?;
    Ok(conn.last_insert_rowid())
}

/// Append one boss history row and return its id.
///
/// A second `victory` row for the same user and boss violates a unique
/// index and fails.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn append_boss_history(
    conn: &Connection,
    user_id: &str,
    boss_id: &str,
    result: BossResult,
    at: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO boss_history (user_id, boss_id, result, created_at_us)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, boss_id, result.as_str(), at.timestamp_micros()],
    )
    .with_context(|| format!("append boss {result} '{boss_id}' for '{user_id}'"))?;
    Ok(conn.last_insert_rowid())
}

/// Add `by` to one daily counter, creating the day row on first touch.
///
/// # Errors
///
/// Returns an error if the upsert fails.
pub fn increment_daily_metric(
    conn: &Connection,
    user_id: &str,
    day: NaiveDate,
    metric: DailyMetric,
    by: u64,
) -> Result<()> {
    let column = metric.as_str();
    let sql = format!(
        "INSERT INTO daily_metrics (user_id, day, {column}) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, day) DO UPDATE SET {column} = {column} + excluded.{column}"
    );
    let by = i64::try_from(by).context("daily metric increment out of range")?;
    conn.execute(&sql, params![user_id, day.format(DAY_FORMAT).to_string(), by])
        .with_context(|| format!("increment {column} for '{user_id}' on {day}"))?;
    Ok(())
}

/// Most recent XP ledger rows, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or a row cannot be decoded.
pub fn recent_xp_events(conn: &Connection, user_id: &str, limit: u32) -> Result<Vec<XpEvent>> {
    let mut stmt = conn
        .prepare(
            "SELECT event_id, user_id, event_type, xp_amount, multipliers_json, created_at_us
             FROM xp_events WHERE user_id = ?1
             ORDER BY created_at_us DESC, event_id DESC LIMIT ?2",
        )
        .context("prepare recent_xp_events")?;
    let rows = stmt
        .query_map(params![user_id, limit], |row| {
            let multipliers: String = row.get(4)?;
            Ok(XpEvent {
                id: row.get(0)?,
                user_id: row.get(1)?,
                event_type: row.get(2)?,
                xp_amount: row.get(3)?,
                multipliers: serde_json::from_str(&multipliers).map_err(|error| {
                    rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(error))
                })?,
                created_at: timestamp(row, 5)?,
            })
        })
        .context("execute recent_xp_events")?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row.context("read xp event row")?);
    }
    Ok(events)
}

/// Most recent activity log rows, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn recent_activity(
    conn: &Connection,
    user_id: &str,
    limit: u32,
) -> Result<Vec<ActivityLogEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT entry_id, user_id, action, details, xp_earned, created_at_us
             FROM activity_log WHERE user_id = ?1
             ORDER BY created_at_us DESC, entry_id DESC LIMIT ?2",
        )
        .context("prepare recent_activity")?;
    let rows = stmt
        .query_map(params![user_id, limit], |row| {
            Ok(ActivityLogEntry {
                id: row.get(0)?,
                user_id: row.get(1)?,
                action: row.get(2)?,
                details: row.get(3)?,
                xp_earned: row.get(4)?,
                created_at: timestamp(row, 5)?,
            })
        })
        .context("execute recent_activity")?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row.context("read activity row")?);
    }
    Ok(entries)
}

/// Most recent boss battle outcomes, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or a result value is unknown.
pub fn boss_history(conn: &Connection, user_id: &str, limit: u32) -> Result<Vec<BossHistoryEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT entry_id, user_id, boss_id, result, created_at_us
             FROM boss_history WHERE user_id = ?1
             ORDER BY created_at_us DESC, entry_id DESC LIMIT ?2",
        )
        .context("prepare boss_history")?;
    let rows = stmt
        .query_map(params![user_id, limit], |row| {
            let result: String = row.get(3)?;
            Ok(BossHistoryEntry {
                id: row.get(0)?,
                user_id: row.get(1)?,
                boss_id: row.get(2)?,
                result: result.parse().map_err(|error| {
                    rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error))
                })?,
                created_at: timestamp(row, 4)?,
            })
        })
        .context("execute boss_history")?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row.context("read boss history row")?);
    }
    Ok(entries)
}

/// Daily counters from `since` (inclusive) onward, newest day first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored day cannot be parsed.
pub fn daily_metrics_since(
    conn: &Connection,
    user_id: &str,
    since: NaiveDate,
) -> Result<Vec<(NaiveDate, DailyMetrics)>> {
    let mut stmt = conn
        .prepare(
            "SELECT day, dials, connects, calls_under_30s, calls_over_2min,
                    appointments, shows, deals, sms_enrollments
             FROM daily_metrics WHERE user_id = ?1 AND day >= ?2
             ORDER BY day DESC",
        )
        .context("prepare daily_metrics_since")?;
    let rows = stmt
        .query_map(
            params![user_id, since.format(DAY_FORMAT).to_string()],
            |row| {
                let day: String = row.get(0)?;
                let day = NaiveDate::parse_from_str(&day, DAY_FORMAT).map_err(|error| {
                    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(error))
                })?;
                Ok((
                    day,
                    DailyMetrics {
                        dials: row.get(1)?,
                        connects: row.get(2)?,
                        calls_under_30s: row.get(3)?,
                        calls_over_2min: row.get(4)?,
                        appointments: row.get(5)?,
                        shows: row.get(6)?,
                        deals: row.get(7)?,
                        sms_enrollments: row.get(8)?,
                    },
                ))
            },
        )
        .context("execute daily_metrics_since")?;

    let mut days = Vec::new();
    for row in rows {
        days.push(row.context("read daily metrics row")?);
    }
    Ok(days)
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let micros: i64 = row.get(idx)?;
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {micros}").into(),
        )
    })
}

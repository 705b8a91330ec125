//! `rungs log`: newest-first views over the append-only logs.

use crate::cmd::require_progression;
use crate::output::{OutputMode, render_mode};
use anyhow::Result;
use clap::{Args, ValueEnum};
use rungs_core::ProgressionEngine;
use rungs_core::model::progression::{ActivityLogEntry, BossHistoryEntry, XpEvent};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogKind {
    /// XP ledger rows.
    Xp,
    /// Human-readable activity feed.
    Activity,
    /// Boss battle outcomes.
    Boss,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Rep identifier.
    pub user: String,

    /// Which log to read.
    #[arg(long, value_enum, default_value = "activity")]
    pub kind: LogKind,

    /// Maximum number of rows, newest first.
    #[arg(long, short = 'n', default_value_t = 20)]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum LogRows {
    Xp(Vec<XpEvent>),
    Activity(Vec<ActivityLogEntry>),
    Boss(Vec<BossHistoryEntry>),
}

fn stamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

fn write_rows(rows: &LogRows, w: &mut dyn Write) -> io::Result<()> {
    match rows {
        LogRows::Xp(events) => {
            for event in events {
                let multipliers = event
                    .multipliers
                    .iter()
                    .map(|(name, factor)| format!("{name}x{factor}"))
                    .collect::<Vec<_>>()
                    .join(",");
                write!(
                    w,
                    "{}  {:>+6}  {}",
                    stamp(event.created_at),
                    event.xp_amount,
                    event.event_type
                )?;
                if !multipliers.is_empty() {
                    write!(w, " [{multipliers}]")?;
                }
                writeln!(w)?;
            }
        }
        LogRows::Activity(entries) => {
            for entry in entries {
                writeln!(
                    w,
                    "{}  {:<18} {}{}",
                    stamp(entry.created_at),
                    entry.action,
                    entry.details,
                    if entry.xp_earned == 0 {
                        String::new()
                    } else {
                        format!(" ({:+} xp)", entry.xp_earned)
                    }
                )?;
            }
        }
        LogRows::Boss(entries) => {
            for entry in entries {
                writeln!(
                    w,
                    "{}  {:<12} {}",
                    stamp(entry.created_at),
                    entry.boss_id,
                    entry.result.as_str()
                )?;
            }
        }
    }
    Ok(())
}

/// Execute `rungs log <user>`.
///
/// # Errors
///
/// Returns an error if the rep is unknown or the store read fails.
pub fn run_log(args: &LogArgs, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    require_progression(engine, output, &args.user)?;
    let rows = match args.kind {
        LogKind::Xp => LogRows::Xp(engine.recent_xp_events(&args.user, args.limit)?),
        LogKind::Activity => LogRows::Activity(engine.recent_activity(&args.user, args.limit)?),
        LogKind::Boss => LogRows::Boss(engine.boss_history(&args.user, args.limit)?),
    };
    render_mode(output, &rows, write_rows, write_rows)
}

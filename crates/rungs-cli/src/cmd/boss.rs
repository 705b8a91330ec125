//! `rungs boss`: boss battle outcomes and status.

use crate::cmd::require_progression;
use crate::output::{CliError, OutputMode, pretty_kv, pretty_rule, render_error, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use rungs_core::ProgressionEngine;
use rungs_core::boss::BossDefeat;
use rungs_core::error::ErrorCode;
use serde::Serialize;
use std::io::Write;

#[derive(Subcommand, Debug)]
pub enum BossCommand {
    /// Record a victory. Rewards are issued on the first one only.
    Defeat(BossArgs),
    /// Record a lost attempt.
    Attempt(BossArgs),
    /// Show unlock state, defeat state and attempt count.
    Status(BossArgs),
}

#[derive(Args, Debug)]
pub struct BossArgs {
    /// Rep identifier.
    pub user: String,

    /// Boss id from the catalog.
    pub boss: String,
}

/// Dispatch `rungs boss <subcommand>`.
///
/// # Errors
///
/// Returns an error if the rep or boss is unknown, or the store fails.
pub fn run_boss(command: &BossCommand, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    let args = match command {
        BossCommand::Defeat(args) | BossCommand::Attempt(args) | BossCommand::Status(args) => args,
    };
    require_progression(engine, output, &args.user)?;
    if engine.catalog().boss(&args.boss).is_none() {
        render_error(
            output,
            &CliError::from_code(ErrorCode::UnknownBoss, format!("unknown boss '{}'", args.boss)),
        )?;
        anyhow::bail!("unknown boss '{}'", args.boss);
    }

    match command {
        BossCommand::Defeat(args) => run_defeat(args, output, engine),
        BossCommand::Attempt(args) => run_attempt(args, output, engine),
        BossCommand::Status(args) => run_status(args, output, engine),
    }
}

fn run_defeat(args: &BossArgs, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    let Some(outcome) = engine.defeat_boss(&args.user, &args.boss)? else {
        anyhow::bail!("no progression for '{}'", args.user);
    };
    render_mode(
        output,
        &outcome,
        |o, w| match o {
            BossDefeat::Rewarded { rewards, xp } => writeln!(
                w,
                "outcome=rewarded xp={} badge={} title={} total_xp={}",
                rewards.xp, rewards.badge, rewards.title, xp.total_xp
            ),
            BossDefeat::AlreadyDefeated => writeln!(w, "outcome=already_defeated"),
            BossDefeat::UnknownBoss => writeln!(w, "outcome=unknown_boss"),
        },
        |o, w| match o {
            BossDefeat::Rewarded { rewards, xp } => {
                writeln!(w, "Victory over {}!", args.boss)?;
                pretty_kv(w, "XP", format!("+{}", xp.xp_earned))?;
                pretty_kv(w, "Badge", rewards.badge.to_string())?;
                pretty_kv(w, "Title", &rewards.title)?;
                if xp.leveled_up {
                    pretty_kv(w, "Level", format!("{} (level up!)", xp.new_level))?;
                }
                pretty_rule(w)
            }
            BossDefeat::AlreadyDefeated => {
                writeln!(w, "{} was already defeated; no rewards issued", args.boss)
            }
            BossDefeat::UnknownBoss => writeln!(w, "unknown boss '{}'", args.boss),
        },
    )
}

#[derive(Debug, Serialize)]
struct AttemptReport<'a> {
    boss: &'a str,
    attempts: u32,
}

fn run_attempt(args: &BossArgs, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    let attempts = engine
        .record_boss_attempt(&args.user, &args.boss)?
        .unwrap_or_default();
    render_mode(
        output,
        &AttemptReport {
            boss: &args.boss,
            attempts,
        },
        |r, w| writeln!(w, "boss={} attempts={}", r.boss, r.attempts),
        |r, w| writeln!(w, "Attempt #{} against {} recorded", r.attempts, r.boss),
    )
}

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    boss: &'a str,
    name: &'a str,
    unlock_level: u32,
    unlocked: bool,
    defeated: bool,
    attempts: u32,
}

fn run_status(args: &BossArgs, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    let Some(definition) = engine.catalog().boss(&args.boss) else {
        anyhow::bail!("unknown boss '{}'", args.boss);
    };
    let attempts = require_progression(engine, output, &args.user)?.attempts_for(&args.boss);
    let report = StatusReport {
        boss: &definition.id,
        name: &definition.name,
        unlock_level: definition.unlock_level,
        unlocked: engine.is_boss_unlocked(&args.user, &args.boss)?,
        defeated: engine.is_boss_defeated(&args.user, &args.boss)?,
        attempts,
    };
    render_mode(
        output,
        &report,
        |r, w| {
            writeln!(
                w,
                "boss={} unlocked={} defeated={} attempts={}",
                r.boss, r.unlocked, r.defeated, r.attempts
            )
        },
        |r, w| {
            pretty_kv(w, "Boss", format!("{} ({})", r.name, r.boss))?;
            pretty_kv(
                w,
                "Unlocked",
                if r.unlocked {
                    "yes".to_string()
                } else {
                    format!("no (level {})", r.unlock_level)
                },
            )?;
            pretty_kv(w, "Defeated", if r.defeated { "yes" } else { "no" })?;
            pretty_kv(w, "Attempts", r.attempts.to_string())?;
            pretty_rule(w)
        },
    )
}

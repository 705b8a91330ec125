//! `rungs rank`: promotion diagnostics and forward-only promotion.

use crate::cmd::require_progression;
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use rungs_core::ProgressionEngine;
use rungs_core::gate::Eligibility;
use serde::Serialize;
use std::io::Write;

#[derive(Subcommand, Debug)]
pub enum RankCommand {
    /// List what stands between the rep and the next rank.
    Check(RankCheckArgs),
    /// Advance one rank if every requirement is met.
    Promote(RankPromoteArgs),
}

#[derive(Args, Debug)]
pub struct RankCheckArgs {
    /// Rep identifier.
    pub user: String,
}

#[derive(Args, Debug)]
pub struct RankPromoteArgs {
    /// Rep identifier.
    pub user: String,

    /// Expected next rank id; promotion is refused if it differs.
    #[arg(long = "to")]
    pub target: Option<String>,
}

/// Dispatch `rungs rank <subcommand>`.
///
/// # Errors
///
/// Returns an error if the rep is unknown or the store fails.
pub fn run_rank(command: &RankCommand, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    match command {
        RankCommand::Check(args) => run_check(args, output, engine),
        RankCommand::Promote(args) => run_promote(args, output, engine),
    }
}

fn run_check(args: &RankCheckArgs, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    require_progression(engine, output, &args.user)?;
    let Some(eligibility) = engine.check_eligibility(&args.user)? else {
        anyhow::bail!("no progression for '{}'", args.user);
    };
    render_mode(
        output,
        &eligibility,
        |e, w| {
            writeln!(
                w,
                "eligible={} current={} next={}",
                e.eligible,
                e.current_rank,
                e.next_rank.as_deref().unwrap_or("-")
            )?;
            for missing in &e.missing {
                writeln!(w, "missing={missing}")?;
            }
            Ok(())
        },
        |e, w| {
            pretty_section(w, "Rank eligibility")?;
            pretty_kv(w, "Current", &e.current_rank)?;
            pretty_kv(w, "Next", e.next_rank.as_deref().unwrap_or("-"))?;
            pretty_kv(w, "Eligible", if e.eligible { "yes" } else { "no" })?;
            if !e.missing.is_empty() {
                writeln!(w)?;
                for missing in &e.missing {
                    writeln!(w, "  - {missing}")?;
                }
            }
            pretty_rule(w)
        },
    )
}

#[derive(Debug, Serialize)]
struct PromoteReport {
    promoted: bool,
    rank: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    eligibility: Option<Eligibility>,
}

fn run_promote(
    args: &RankPromoteArgs,
    output: OutputMode,
    engine: &ProgressionEngine,
) -> Result<()> {
    require_progression(engine, output, &args.user)?;
    let promoted = engine.promote_rank(&args.user, args.target.as_deref())?;
    let rank = require_progression(engine, output, &args.user)?.rank;
    let eligibility = if promoted {
        None
    } else {
        engine.check_eligibility(&args.user)?
    };

    let report = PromoteReport {
        promoted,
        rank,
        eligibility,
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "promoted={} rank={}", r.promoted, r.rank),
        |r, w| {
            if r.promoted {
                let name = engine
                    .catalog()
                    .rank(&r.rank)
                    .map_or(r.rank.as_str(), |def| def.name.as_str());
                writeln!(w, "Promoted to {name}")?;
                return Ok(());
            }
            writeln!(w, "Not promoted; still {}", r.rank)?;
            if let Some(eligibility) = &r.eligibility {
                let requested_other = eligibility.next_rank.as_ref().filter(|_| eligibility.eligible);
                if let Some(next) = requested_other {
                    writeln!(w, "  - eligible for {next}, not the requested rank")?;
                }
                for missing in &eligibility.missing {
                    writeln!(w, "  - {missing}")?;
                }
            }
            Ok(())
        },
    )
}

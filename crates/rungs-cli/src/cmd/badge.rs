//! `rungs badge`: direct grants and metric-driven evaluation.

use crate::cmd::{parse_key_value, require_progression};
use crate::output::{CliError, OutputMode, render_error, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use rungs_core::ProgressionEngine;
use rungs_core::badges::MetricSnapshot;
use rungs_core::model::badge::BadgeKey;
use serde::Serialize;
use std::io::Write;

#[derive(Subcommand, Debug)]
pub enum BadgeCommand {
    /// Grant a badge tier directly, e.g. `opener_elite.silver`.
    Add(BadgeAddArgs),
    /// Evaluate every badge against supplied metrics and award new tiers.
    Evaluate(BadgeEvaluateArgs),
}

#[derive(Args, Debug)]
pub struct BadgeAddArgs {
    /// Rep identifier.
    pub user: String,

    /// Badge key as `<badge_id>.<tier>`.
    pub badge: String,
}

#[derive(Args, Debug)]
pub struct BadgeEvaluateArgs {
    /// Rep identifier.
    pub user: String,

    /// Metric value as `name=value`. Repeatable. Streak, deals, defeated
    /// bosses and efficiency rates are filled in from stored state.
    #[arg(long = "metric", short = 'm', value_parser = parse_key_value)]
    pub metrics: Vec<(String, f64)>,
}

#[derive(Debug, Serialize)]
struct BadgeReport {
    awarded: Vec<BadgeKey>,
}

/// Dispatch `rungs badge <subcommand>`.
///
/// # Errors
///
/// Returns an error if the rep is unknown, the badge key is malformed, or
/// the store fails.
pub fn run_badge(command: &BadgeCommand, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    let report = match command {
        BadgeCommand::Add(args) => {
            require_progression(engine, output, &args.user)?;
            let key = match args.badge.parse::<BadgeKey>() {
                Ok(key) => key,
                Err(e) => {
                    render_error(output, &CliError::from_code(e.code(), e.to_string()))?;
                    anyhow::bail!("{e}");
                }
            };
            let added = engine.add_badge(&args.user, &key)?;
            BadgeReport {
                awarded: if added { vec![key] } else { Vec::new() },
            }
        }
        BadgeCommand::Evaluate(args) => {
            require_progression(engine, output, &args.user)?;
            let mut snapshot = MetricSnapshot::new();
            for (name, value) in &args.metrics {
                snapshot.set(name.clone(), *value);
            }
            BadgeReport {
                awarded: engine.evaluate_badges(&args.user, &snapshot)?,
            }
        }
    };

    render_mode(
        output,
        &report,
        |r, w| {
            for key in &r.awarded {
                writeln!(w, "awarded={key}")?;
            }
            Ok(())
        },
        |r, w| {
            if r.awarded.is_empty() {
                return writeln!(w, "No new badges");
            }
            for key in &r.awarded {
                let name = engine
                    .catalog()
                    .badge(&key.badge_id)
                    .map_or(key.badge_id.as_str(), |def| def.name.as_str());
                writeln!(w, "Unlocked {name} ({})", key.tier.label())?;
            }
            Ok(())
        },
    )
}

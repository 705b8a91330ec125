//! `rungs event`, `rungs call`, `rungs deal`: feed activity into the ledger.

use crate::cmd::{parse_key_value, require_progression};
use crate::output::{CliError, OutputMode, pretty_kv, pretty_rule, render_error, render_mode};
use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use rungs_core::ledger::XpOutcome;
use rungs_core::{InboundEvent, ProgressionEngine};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

#[derive(Args, Debug)]
pub struct EventArgs {
    /// Rep identifier.
    pub user: String,

    /// Event type from the catalog vocabulary (aliases accepted).
    pub event_type: String,

    /// Explicit XP amount; bypasses the vocabulary's base XP.
    #[arg(long, allow_negative_numbers = true)]
    pub amount: Option<i64>,

    /// Extra multiplier as `name=factor`. Repeatable.
    #[arg(long = "multiplier", short = 'm', value_parser = parse_key_value)]
    pub multipliers: Vec<(String, f64)>,

    /// Free-form note stored on the ledger row.
    #[arg(long)]
    pub details: Option<String>,

    /// When the event happened (RFC 3339). Defaults to now.
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Rep identifier.
    pub user: String,

    /// Call length in seconds.
    #[arg(long)]
    pub seconds: u64,
}

#[derive(Args, Debug)]
pub struct DealArgs {
    /// Rep identifier.
    pub user: String,

    /// Free-form note stored on the ledger row.
    #[arg(long)]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
struct EventReport<'a> {
    user_id: &'a str,
    event_type: &'a str,
    #[serde(flatten)]
    outcome: XpOutcome,
}

fn write_outcome_text(outcome: &XpOutcome, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "xp_earned={} total_xp={} level={} leveled_up={} streak_days={}",
        outcome.xp_earned,
        outcome.total_xp,
        outcome.new_level,
        outcome.leveled_up,
        outcome.streak_days
    )
}

fn write_outcome_pretty(outcome: &XpOutcome, w: &mut dyn Write) -> io::Result<()> {
    pretty_kv(w, "XP earned", format!("+{}", outcome.xp_earned))?;
    pretty_kv(w, "Total XP", outcome.total_xp.to_string())?;
    if outcome.leveled_up {
        pretty_kv(w, "Level", format!("{} (level up!)", outcome.new_level))?;
    } else {
        pretty_kv(w, "Level", outcome.new_level.to_string())?;
    }
    pretty_kv(w, "Streak", format!("{} day(s)", outcome.streak_days))?;
    pretty_rule(w)
}

/// Execute `rungs event <user> <type>`.
///
/// An event type outside the vocabulary with no `--amount` earns nothing;
/// the engine logs a warning and the reported outcome is zero.
///
/// # Errors
///
/// Returns an error if the rep is unknown, a multiplier is rejected, or the
/// store write fails.
pub fn run_event(args: &EventArgs, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    require_progression(engine, output, &args.user)?;

    let mut event = InboundEvent::new(&args.user, &args.event_type);
    if let Some(amount) = args.amount {
        event = event.with_amount(amount);
    }
    for (name, factor) in &args.multipliers {
        event = event.with_multiplier(name, *factor);
    }
    if let Some(details) = &args.details {
        event = event.with_details(details);
    }
    if let Some(at) = args.at {
        event = event.at(at);
    }
    if let Err(e) = event.validate() {
        render_error(output, &CliError::from_code(e.code(), e.to_string()))?;
        anyhow::bail!("{e}");
    }

    let outcome = engine.ingest(&event)?;
    let report = EventReport {
        user_id: &args.user,
        event_type: &args.event_type,
        outcome,
    };
    render_mode(
        output,
        &report,
        |r, w| write_outcome_text(&r.outcome, w),
        |r, w| {
            writeln!(w, "{} -> {}", r.event_type, r.user_id)?;
            write_outcome_pretty(&r.outcome, w)
        },
    )
}

#[derive(Debug, Serialize)]
struct CallReport<'a> {
    user_id: &'a str,
    seconds: u64,
    bucket: Option<&'static str>,
}

const fn call_bucket(duration: Duration) -> Option<&'static str> {
    if duration.as_secs() < rungs_core::engine::SHORT_CALL.as_secs() {
        Some("calls_under_30s")
    } else if duration.as_secs() >= rungs_core::engine::LONG_CALL.as_secs() {
        Some("calls_over_2min")
    } else {
        None
    }
}

/// Execute `rungs call <user> --seconds N`.
///
/// # Errors
///
/// Returns an error if the rep is unknown or the store write fails.
pub fn run_call(args: &CallArgs, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    require_progression(engine, output, &args.user)?;
    let duration = Duration::from_secs(args.seconds);
    let recorded = engine.record_call_metrics(&args.user, duration)?;
    let report = CallReport {
        user_id: &args.user,
        seconds: args.seconds,
        bucket: if recorded { call_bucket(duration) } else { None },
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "bucket={}", r.bucket.unwrap_or("none")),
        |r, w| match r.bucket {
            Some(bucket) => writeln!(w, "Recorded {}s call under {bucket}", r.seconds),
            None => writeln!(w, "{}s call is mid-length; no counter moved", r.seconds),
        },
    )
}

#[derive(Debug, Serialize)]
struct DealReport<'a> {
    user_id: &'a str,
    closed_deals: u32,
    #[serde(flatten)]
    outcome: XpOutcome,
}

/// Execute `rungs deal <user>`: award `deal_closed` XP and bump the
/// closed-deal counter.
///
/// # Errors
///
/// Returns an error if the rep is unknown or the store write fails.
pub fn run_deal(args: &DealArgs, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    require_progression(engine, output, &args.user)?;

    let mut event = InboundEvent::new(&args.user, "deal_closed");
    if let Some(details) = &args.details {
        event = event.with_details(details);
    }
    let outcome = engine.ingest(&event)?;
    let closed_deals = engine.increment_deals(&args.user)?.unwrap_or_default();

    let report = DealReport {
        user_id: &args.user,
        closed_deals,
        outcome,
    };
    render_mode(
        output,
        &report,
        |r, w| {
            write!(w, "closed_deals={} ", r.closed_deals)?;
            write_outcome_text(&r.outcome, w)
        },
        |r, w| {
            pretty_kv(w, "Deals", r.closed_deals.to_string())?;
            write_outcome_pretty(&r.outcome, w)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_buckets_match_thresholds() {
        assert_eq!(call_bucket(Duration::from_secs(29)), Some("calls_under_30s"));
        assert_eq!(call_bucket(Duration::from_secs(30)), None);
        assert_eq!(call_bucket(Duration::from_secs(119)), None);
        assert_eq!(call_bucket(Duration::from_secs(120)), Some("calls_over_2min"));
    }
}

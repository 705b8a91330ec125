//! `rungs show`, `rungs efficiency`, `rungs users`: read-only views.

use crate::cmd::require_progression;
use crate::output::{
    OutputMode, pretty_kv, pretty_rule, pretty_section, progress_bar, render, render_mode,
};
use anyhow::Result;
use clap::Args;
use rungs_core::efficiency::EfficiencyReport;
use rungs_core::{ProgressionEngine, ProgressionSnapshot};
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Rep identifier.
    pub user: String,
}

#[derive(Args, Debug)]
pub struct EfficiencyArgs {
    /// Rep identifier.
    pub user: String,
}

fn join_or_dash<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let joined = items.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined
    }
}

/// Pretty rendering of a rep's dashboard, shared with `rungs init`.
pub fn write_snapshot(s: &ProgressionSnapshot, w: &mut dyn Write) -> io::Result<()> {
    let p = &s.progression;
    let lp = &s.level_progress;

    pretty_section(w, &format!("{} ({})", p.display_name, p.user_id))?;
    pretty_kv(
        w,
        "Rank",
        s.rank_name
            .as_ref()
            .map_or_else(|| p.rank.clone(), |name| format!("{name} [{}]", p.rank)),
    )?;
    if lp.is_max_level {
        pretty_kv(w, "Level", format!("{} (max)", lp.level))?;
    } else {
        pretty_kv(
            w,
            "Level",
            format!(
                "{} {} {}/{}",
                lp.level,
                progress_bar(lp.percent, 20),
                lp.xp_progress,
                lp.xp_to_next_level
            ),
        )?;
    }
    pretty_kv(w, "Total XP", p.total_xp.to_string())?;
    pretty_kv(w, "Streak", format!("{} day(s)", p.streak_days))?;
    pretty_kv(w, "Deals", p.closed_deals.to_string())?;
    pretty_kv(
        w,
        "Spec",
        p.specialization.clone().unwrap_or_else(|| "-".to_string()),
    )?;
    pretty_kv(
        w,
        "Title",
        p.active_title.clone().unwrap_or_else(|| "-".to_string()),
    )?;
    pretty_kv(w, "Mentees", p.mentee_count.to_string())?;
    if let Some(graduated) = p.graduation_date {
        pretty_kv(w, "Graduated", graduated.format("%Y-%m-%d").to_string())?;
    }
    writeln!(w)?;

    let badges: Vec<String> = p.badges.iter().map(ToString::to_string).collect();
    pretty_kv(w, "Badges", join_or_dash(badges.iter().map(String::as_str)))?;
    pretty_kv(w, "Modules", join_or_dash(p.completed_modules.iter().map(String::as_str)))?;
    pretty_kv(w, "Exams", join_or_dash(p.passed_exams.iter().map(String::as_str)))?;
    pretty_kv(w, "Bosses", join_or_dash(p.defeated_bosses.iter().map(String::as_str)))?;
    pretty_kv(w, "Titles", join_or_dash(p.titles.iter().map(String::as_str)))?;
    pretty_rule(w)
}

fn write_snapshot_text(s: &ProgressionSnapshot, w: &mut dyn Write) -> io::Result<()> {
    let p = &s.progression;
    writeln!(w, "user={}", p.user_id)?;
    writeln!(w, "rank={}", p.rank)?;
    writeln!(w, "level={}", p.current_level)?;
    writeln!(w, "xp={}", p.total_xp)?;
    writeln!(w, "xp_progress={}", s.level_progress.xp_progress)?;
    writeln!(w, "xp_to_next_level={}", s.level_progress.xp_to_next_level)?;
    writeln!(w, "streak_days={}", p.streak_days)?;
    writeln!(w, "closed_deals={}", p.closed_deals)?;
    writeln!(w, "badges={}", p.badges.len())?;
    writeln!(w, "mentees={}", p.mentee_count)
}

/// Execute `rungs show <user>`.
///
/// # Errors
///
/// Returns an error if the rep is unknown or the store read fails.
pub fn run_show(args: &ShowArgs, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    require_progression(engine, output, &args.user)?;
    let Some(snapshot) = engine.snapshot(&args.user)? else {
        anyhow::bail!("no progression for '{}'", args.user);
    };
    render_mode(output, &snapshot, write_snapshot_text, write_snapshot)
}

fn write_efficiency(report: &EfficiencyReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(
        w,
        &format!(
            "Efficiency (last {} day(s), {} with data)",
            report.window_days, report.days_with_data
        ),
    )?;
    if report.is_ramp_period {
        pretty_kv(
            w,
            "Ramp",
            format!(
                "{} {:.0}%",
                progress_bar(report.ramp_progress, 20),
                report.ramp_progress
            ),
        )?;
    }
    for (name, value) in &report.rates {
        let tier = report
            .tiers
            .get(name)
            .map_or("-", |tier| tier.as_str());
        writeln!(w, "  {name:<22} {:>6.1}%  {tier}", value * 100.0)?;
    }
    writeln!(w)?;
    let t = &report.totals;
    pretty_kv(w, "Dials", t.dials.to_string())?;
    pretty_kv(w, "Connects", t.connects.to_string())?;
    pretty_kv(w, "Appointments", t.appointments.to_string())?;
    pretty_kv(w, "Shows", t.shows.to_string())?;
    pretty_kv(w, "Deals", t.deals.to_string())?;
    pretty_rule(w)
}

/// Execute `rungs efficiency <user>`.
///
/// # Errors
///
/// Returns an error if the rep is unknown or the store read fails.
pub fn run_efficiency(
    args: &EfficiencyArgs,
    output: OutputMode,
    engine: &ProgressionEngine,
) -> Result<()> {
    require_progression(engine, output, &args.user)?;
    let report = engine.efficiency(&args.user)?;
    render_mode(
        output,
        &report,
        |r, w| {
            writeln!(w, "ramp={}", r.is_ramp_period)?;
            for (name, value) in &r.rates {
                writeln!(w, "{name}={value:.4}")?;
            }
            Ok(())
        },
        write_efficiency,
    )
}

/// Execute `rungs users`.
///
/// # Errors
///
/// Returns an error if the store read fails.
pub fn run_users(output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    let users = engine.list_users()?;
    render(output, &users, |users, w| {
        for user in users {
            writeln!(w, "{user}")?;
        }
        Ok(())
    })
}

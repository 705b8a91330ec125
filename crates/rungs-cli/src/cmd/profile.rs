//! `rungs profile`: specialization, titles, exams, modules and mentees.

use crate::cmd::require_progression;
use crate::output::{CliError, OutputMode, render_error, render_mode};
use anyhow::Result;
use clap::{Args, Subcommand};
use rungs_core::ProgressionEngine;
use rungs_core::error::ErrorCode;
use serde::Serialize;
use std::io::Write;

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Choose a specialization (one per rep, replaceable).
    Spec(ProfileValueArgs),
    /// Display one of the rep's earned titles.
    Title(ProfileValueArgs),
    /// Record a passed exam.
    Exam(ProfileValueArgs),
    /// Record a completed training module.
    Module(ProfileValueArgs),
    /// Count one more mentee.
    Mentee(ProfileUserArgs),
}

#[derive(Args, Debug)]
pub struct ProfileValueArgs {
    /// Rep identifier.
    pub user: String,

    /// Specialization id, title, exam id or module id.
    pub value: String,
}

#[derive(Args, Debug)]
pub struct ProfileUserArgs {
    /// Rep identifier.
    pub user: String,
}

#[derive(Debug, Serialize)]
struct ProfileReport {
    field: &'static str,
    value: String,
    changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

fn refuse(output: OutputMode, code: ErrorCode, message: String) -> Result<()> {
    render_error(output, &CliError::from_code(code, message.clone()))?;
    anyhow::bail!(message)
}

/// Dispatch `rungs profile <subcommand>`.
///
/// Unknown specializations and unearned titles are reported as errors;
/// repeats of exams and modules succeed with `changed = false`.
///
/// # Errors
///
/// Returns an error if the rep is unknown, the value is refused, or the
/// store fails.
pub fn run_profile(
    command: &ProfileCommand,
    output: OutputMode,
    engine: &ProgressionEngine,
) -> Result<()> {
    let report = match command {
        ProfileCommand::Spec(args) => {
            let progression = require_progression(engine, output, &args.user)?;
            let Some(definition) = engine.catalog().specialization(&args.value) else {
                return refuse(
                    output,
                    ErrorCode::UnknownSpecialization,
                    format!("unknown specialization '{}'", args.value),
                );
            };
            let unlock_level = definition.unlock_level;
            let changed = engine.set_specialization(&args.user, &args.value)?;
            let locked = !changed
                && engine.settings().enforce_specialization_level
                && engine.catalog().levels().level_for(progression.total_xp) < unlock_level;
            ProfileReport {
                field: "specialization",
                value: args.value.clone(),
                changed,
                reason: locked.then_some("level too low"),
            }
        }
        ProfileCommand::Title(args) => {
            require_progression(engine, output, &args.user)?;
            if !engine.set_active_title(&args.user, &args.value)? {
                return refuse(
                    output,
                    ErrorCode::UnknownTitle,
                    format!("title '{}' has not been earned", args.value),
                );
            }
            ProfileReport {
                field: "active_title",
                value: args.value.clone(),
                changed: true,
                reason: None,
            }
        }
        ProfileCommand::Exam(args) => {
            require_progression(engine, output, &args.user)?;
            let changed = engine.pass_exam(&args.user, &args.value)?;
            ProfileReport {
                field: "passed_exams",
                value: args.value.clone(),
                changed,
                reason: (!changed).then_some("already passed"),
            }
        }
        ProfileCommand::Module(args) => {
            require_progression(engine, output, &args.user)?;
            let changed = engine.complete_module(&args.user, &args.value)?;
            ProfileReport {
                field: "completed_modules",
                value: args.value.clone(),
                changed,
                reason: (!changed).then_some("already completed"),
            }
        }
        ProfileCommand::Mentee(args) => {
            require_progression(engine, output, &args.user)?;
            let count = engine.add_mentee(&args.user)?.unwrap_or_default();
            ProfileReport {
                field: "mentee_count",
                value: count.to_string(),
                changed: true,
                reason: None,
            }
        }
    };

    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "{}={} changed={}", r.field, r.value, r.changed),
        |r, w| {
            if r.changed {
                writeln!(w, "Updated {}: {}", r.field, r.value)
            } else {
                writeln!(
                    w,
                    "Unchanged {}: {} ({})",
                    r.field,
                    r.value,
                    r.reason.unwrap_or("no change")
                )
            }
        },
    )
}

//! `rungs init`: create a rep's progression record.

use crate::cmd::show::write_snapshot;
use crate::output::{OutputMode, render_mode};
use anyhow::Result;
use clap::Args;
use rungs_core::ProgressionEngine;
use std::io::Write;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rep identifier, as used by the system of record.
    pub user: String,

    /// Display name. Defaults to the rep identifier.
    #[arg(long)]
    pub name: Option<String>,
}

/// Execute `rungs init`. Creates the store on first use and the rep's
/// aggregate at the first rank; an existing rep is left untouched.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
pub fn run_init(args: &InitArgs, output: OutputMode, engine: &ProgressionEngine) -> Result<()> {
    let name = args.name.as_deref().unwrap_or(&args.user);
    engine.init_progression(&args.user, name)?;
    let Some(snapshot) = engine.snapshot(&args.user)? else {
        anyhow::bail!("progression for '{}' missing after init", args.user);
    };

    render_mode(
        output,
        &snapshot,
        |s, w| {
            writeln!(
                w,
                "initialized user={} rank={} level={} xp={}",
                s.progression.user_id,
                s.progression.rank,
                s.progression.current_level,
                s.progression.total_xp
            )
        },
        |s, w| write_snapshot(s, w),
    )
}

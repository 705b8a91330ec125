pub mod badge;
pub mod boss;
pub mod catalog;
pub mod completions;
pub mod event;
pub mod init;
pub mod log;
pub mod profile;
pub mod rank;
pub mod show;

use crate::output::{CliError, OutputMode, render_error};
use anyhow::{Context as _, Result};
use rungs_core::config::{self, STATE_DIR};
use rungs_core::db::ProgressionStore;
use rungs_core::error::ErrorCode;
use rungs_core::model::progression::UserProgression;
use rungs_core::sync::CommandSyncBinder;
use rungs_core::{Catalog, ProgressionEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::debug;

/// File name of the progression store inside the state directory.
pub const STORE_FILE: &str = "rungs.db";

pub fn store_path(project_root: &Path) -> PathBuf {
    project_root.join(STATE_DIR).join(STORE_FILE)
}

/// Load the effective catalog for a project: the configured file if any,
/// otherwise the built-in one.
///
/// # Errors
///
/// Returns an error if the project config or catalog file is malformed.
pub fn load_catalog(project_root: &Path) -> Result<Catalog> {
    let project = config::load_project_config(project_root)?;
    config::load_catalog(project.catalog_path(project_root).as_deref())
}

/// Open the engine over `<root>/.rungs/rungs.db`.
///
/// With `create` unset a missing store is reported as
/// [`ErrorCode::NotInitialized`] instead of being created empty.
///
/// # Errors
///
/// Returns an error if the store is missing (and `create` is false), or if
/// config, catalog or store cannot be opened.
pub fn open_engine(project_root: &Path, output: OutputMode, create: bool) -> Result<ProgressionEngine> {
    let path = store_path(project_root);
    if !create && !path.exists() {
        render_error(
            output,
            &CliError::from_code(
                ErrorCode::NotInitialized,
                format!("no progression store at {}", path.display()),
            ),
        )?;
        anyhow::bail!("progression store not found");
    }

    let project = config::load_project_config(project_root)?;
    let catalog = config::load_catalog(project.catalog_path(project_root).as_deref())?;
    let store = ProgressionStore::open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let sync_command = project.engine.sync_command.clone();
    let mut engine = ProgressionEngine::new(store, Arc::new(catalog), project.engine);
    if let Some(command) = sync_command {
        debug!(%command, "outbound sync enabled");
        engine = engine.with_sync(Arc::new(CommandSyncBinder::new(command)), Handle::current());
    }
    Ok(engine)
}

/// Load a rep's aggregate, rendering [`ErrorCode::NotInitialized`] when the
/// rep has no progression yet.
///
/// # Errors
///
/// Returns an error if the rep is unknown or the store read fails.
pub fn require_progression(
    engine: &ProgressionEngine,
    output: OutputMode,
    user_id: &str,
) -> Result<UserProgression> {
    if let Some(progression) = engine.progression(user_id)? {
        return Ok(progression);
    }
    render_error(
        output,
        &CliError::from_code(
            ErrorCode::NotInitialized,
            format!("no progression for '{user_id}'"),
        ),
    )?;
    anyhow::bail!("no progression for '{user_id}'")
}

/// Parse a `name=value` pair given on the command line.
pub fn parse_key_value(raw: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing name in '{raw}'"));
    }
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("'{value}' is not a finite number"));
    }
    Ok((name.to_string(), value))
}

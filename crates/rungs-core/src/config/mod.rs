//! Configuration: the static rule catalog plus per-project and per-user
//! settings.
//!
//! Loaders follow one rule: a missing file yields defaults, a malformed one
//! is an error carrying the offending path.

pub mod catalog;

pub use catalog::{Catalog, CatalogError, load_catalog};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-local state directory, relative to the project root.
pub const STATE_DIR: &str = ".rungs";

/// `<root>/.rungs/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Quiet period before a burst of mutations is pushed to the system of
    /// record.
    #[serde(default = "default_sync_debounce_ms")]
    pub sync_debounce_ms: u64,
    /// Days of daily metrics folded into efficiency rates.
    #[serde(default = "default_efficiency_window_days")]
    pub efficiency_window_days: u32,
    /// Dials required before efficiency rates leave the ramp period.
    #[serde(default = "default_ramp_min_dials")]
    pub ramp_min_dials: u64,
    /// Refuse specializations whose unlock level the rep has not reached.
    #[serde(default = "default_true")]
    pub enforce_specialization_level: bool,
    /// Shell command run for each outbound sync. CLI only.
    #[serde(default)]
    pub sync_command: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_debounce_ms: default_sync_debounce_ms(),
            efficiency_window_days: default_efficiency_window_days(),
            ramp_min_dials: default_ramp_min_dials(),
            enforce_specialization_level: default_true(),
            sync_command: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog file replacing the built-in one. Relative paths resolve
    /// against the project root.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// `<config_dir>/rungs/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Load the project config.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(STATE_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load only the `[engine]` table of the project config.
///
/// # Errors
///
/// Same as [`load_project_config`].
pub fn load_engine_config(project_root: &Path) -> Result<EngineConfig> {
    Ok(load_project_config(project_root)?.engine)
}

/// Load the per-user config from the platform config directory.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("rungs/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

impl ProjectConfig {
    /// Catalog path with relative entries resolved against `project_root`.
    #[must_use]
    pub fn catalog_path(&self, project_root: &Path) -> Option<PathBuf> {
        self.catalog.path.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                project_root.join(path)
            }
        })
    }
}

const fn default_true() -> bool {
    true
}

const fn default_sync_debounce_ms() -> u64 {
    2_000
}

const fn default_efficiency_window_days() -> u32 {
    7
}

const fn default_ramp_min_dials() -> u64 {
    200
}

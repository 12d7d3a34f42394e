//! Locates the optional `sideblur.toml`: an explicit `--config` path wins,
//! then `$SIDEBLUR_CONFIG_DIR`, then the platform config directory.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use directories_next::ProjectDirs;

use crate::config::CONFIG_FILE_NAME;

pub const ENV_CONFIG_DIR: &str = "SIDEBLUR_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "sideblur";
const APPLICATION: &str = "sideblur";

/// Config file to load, or `None` when no file exists at the default
/// locations. An explicit path must exist.
pub fn resolve_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("config file {} does not exist", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    let Some(dir) = config_dir() else {
        tracing::debug!("no config directory available; using defaults");
        return Ok(None);
    };
    let candidate = dir.join(CONFIG_FILE_NAME);
    Ok(candidate.is_file().then_some(candidate))
}

pub fn config_dir() -> Option<PathBuf> {
    if let Some(value) = env_override(ENV_CONFIG_DIR) {
        return Some(value);
    }
    ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

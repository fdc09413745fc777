//! Where topoform keeps its inputs and its snapshot
//!
//! # Environment Variables
//!
//! - `TOPOFORM_CONFIG_DIR` - Directory holding `topology.toml`
//! - `TOPOFORM_STATE_DIR` - Directory holding the snapshot file
//!
//! Without overrides, `XDG_CONFIG_HOME` / `XDG_STATE_HOME` are honored, then
//! the platform default under the home directory.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "TOPOFORM_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "TOPOFORM_STATE_DIR";

/// Name of the inputs file inside the config directory
pub const CONFIG_FILE: &str = "topology.toml";

/// Name of the snapshot file inside the state directory
pub const STATE_KEY: &str = "vm-topology.tfstate.json";

const APP_DIR: &str = "topoform";

/// Directory holding the inputs file
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config).join(APP_DIR));
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join(APP_DIR));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join(APP_DIR))
}

/// Directory holding the snapshot
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg_state).join(APP_DIR));
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            return Ok(local_app_data.join(APP_DIR));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".local").join("state").join(APP_DIR))
}

/// Default inputs file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Snapshot file
pub fn state_file() -> Result<PathBuf> {
    Ok(state_dir()?.join(STATE_KEY))
}

/// Expand `~` and environment variables in a path string
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

//! Config file discovery and loading

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use reconciler::{Config, Settings};

const APP_DIR: &str = "amp-follower";
const CONFIG_FILE: &str = "config.json";

/// `<config dir>/amp-follower/config.json`
pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().ok_or_else(|| anyhow!("No configuration directory on this system"))?;
    Ok(dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Resolve `explicit` or the default path
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

/// Parse raw settings from JSON text
pub fn parse_settings(json: &str) -> Result<Settings> {
    serde_json::from_str(json).context("Invalid configuration file")
}

/// Read and validate the config at `path`
pub fn load_config(path: &Path) -> Result<Config> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration from {}", path.display()))?;
    let settings = parse_settings(&json)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Config::try_from(settings).with_context(|| format!("Invalid configuration in {}", path.display()))
}

pub mod config_cmd;
pub mod fingerprint;
pub mod run;

use std::path::Path;

use ticketsmith_config::{AppConfig, ConfigError};
use ticketsmith_core::Mission;

/// `--config PATH` when given, otherwise the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => AppConfig::load_with_overrides(path),
        None => AppConfig::load(),
    }
}

pub fn read_mission(path: &Path) -> Result<Mission, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read mission file {}: {e}", path.display()))?;
    let mission = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid mission file {}: {e}", path.display()))?;
    Ok(mission)
}

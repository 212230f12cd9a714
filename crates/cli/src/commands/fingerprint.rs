//! `ticketsmith fingerprint`: print the idempotency fingerprint a scaffold
//! run of this mission would use.

use std::path::Path;

use ticketsmith_workflow::{branch_name, scaffold_fingerprint};

use super::{load_config, read_mission};

pub fn run(config_path: Option<&Path>, mission_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let mission = read_mission(mission_path)?;

    let version = &config.scaffolding.contract_version;
    println!("{}", scaffold_fingerprint(&mission, version));
    println!("   Mission:   {}", mission.key);
    println!("   Contract:  v{version}");
    println!(
        "   Branch:    {}",
        branch_name(&config.scaffolding.branch_prefix, &mission.key, mission.service_name())
    );
    Ok(())
}

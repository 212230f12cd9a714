//! `ticketsmith config`: configuration management commands.

use std::path::Path;

use ticketsmith_config::AppConfig;

use super::load_config;

pub fn show(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path).map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", config.to_toml());
    Ok(())
}

pub fn validate(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    };
    println!("   ✅ Config parsed and validated");

    let mut warnings = Vec::new();
    let mut referenced: Vec<&str> = config
        .scaffolder
        .priority_models
        .iter()
        .chain(&config.reviewer.priority_models)
        .filter_map(|m| m.split_once(':').map(|(provider, _)| provider))
        .collect();
    referenced.sort_unstable();
    referenced.dedup();
    for provider in &referenced {
        let has_key = config
            .providers
            .get(*provider)
            .is_some_and(|p| p.api_key.is_some());
        if !has_key && *provider != "ollama" {
            warnings.push(format!(
                "No API key for provider '{provider}' (set {}_API_KEY)",
                provider.to_ascii_uppercase()
            ));
        }
    }

    if warnings.is_empty() {
        println!("   ✅ All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    println!();
    println!("   Scaffolder:  {} ({})", config.scaffolder.mode, config.scaffolder.priority_models.join(", "));
    println!("   Reviewer:    {} ({})", config.reviewer.mode, config.reviewer.priority_models.join(", "));
    println!("   Store:       {}", config.store.resolved_path().display());
    println!("   Providers:   {}", referenced.join(", "));
    Ok(())
}

pub fn path(path: Option<&Path>) {
    match path {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", AppConfig::config_dir().join("config.toml").display()),
    }
}

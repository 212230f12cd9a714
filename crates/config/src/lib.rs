//! Configuration loading, validation, and management for Ticketsmith.
//!
//! Loads configuration from `~/.ticketsmith/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use ticketsmith_core::{AgentRole, CapabilityRole, ExecutionMode, ModelId};

/// The root configuration structure.
///
/// Maps directly to `~/.ticketsmith/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model backends keyed by provider prefix (`openai`, `deepseek`, ...)
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,

    #[serde(default = "AgentSettings::scaffolder")]
    pub scaffolder: AgentSettings,

    #[serde(default = "AgentSettings::reviewer")]
    pub reviewer: AgentSettings,

    #[serde(default)]
    pub reasoning: ReasoningConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub scaffolding: ScaffoldingConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub safety: SafetyConfig,
}

/// Providers whose `<NAME>_API_KEY` variable is checked even when the
/// config file does not mention them.
const WELL_KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "deepseek", "groq", "together"];

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("providers", &self.providers)
            .field("scaffolder", &self.scaffolder)
            .field("reviewer", &self.reviewer)
            .field("reasoning", &self.reasoning)
            .field("tracker", &self.tracker)
            .field("scaffolding", &self.scaffolding)
            .field("store", &self.store)
            .field("safety", &self.safety)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// HTTP timeout for one request, in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_http_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            timeout_secs: default_http_timeout(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Per-agent execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Ranked `provider:model` identifiers
    #[serde(default)]
    pub priority_models: Vec<String>,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    5
}

impl AgentSettings {
    fn scaffolder() -> Self {
        Self {
            mode: ExecutionMode::Deterministic,
            priority_models: vec!["openai:gpt-4o".into(), "deepseek:deepseek-chat".into()],
            max_iterations: default_max_iterations(),
        }
    }

    fn reviewer() -> Self {
        Self {
            mode: ExecutionMode::Deterministic,
            priority_models: vec!["openai:gpt-4o".into(), "openrouter:anthropic/claude-sonnet-4".into()],
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Upper bound for one candidate attempt, in seconds
    #[serde(default = "default_candidate_timeout")]
    pub candidate_timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.2
}
fn default_candidate_timeout() -> u64 {
    120
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: None,
            candidate_timeout_secs: default_candidate_timeout(),
        }
    }
}

/// Tracker workflow status names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_in_review")]
    pub in_review_status: String,

    #[serde(default = "default_done")]
    pub done_status: String,

    #[serde(default = "default_changes_requested")]
    pub changes_requested_status: String,
}

fn default_in_review() -> String {
    "In Review".into()
}
fn default_done() -> String {
    "Done".into()
}
fn default_changes_requested() -> String {
    "Changes Requested".into()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            in_review_status: default_in_review(),
            done_status: default_done(),
            changes_requested_status: default_changes_requested(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaffoldingConfig {
    /// Used when the mission does not name a target branch
    #[serde(default = "default_target_branch")]
    pub default_target_branch: String,

    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,

    /// Part of every scaffold fingerprint; bump it to allow re-scaffolding
    #[serde(default = "default_contract_version")]
    pub contract_version: String,
}

fn default_target_branch() -> String {
    "main".into()
}
fn default_branch_prefix() -> String {
    "feature/".into()
}
fn default_contract_version() -> String {
    "1".into()
}

impl Default for ScaffoldingConfig {
    fn default() -> Self {
        Self {
            default_target_branch: default_target_branch(),
            branch_prefix: default_branch_prefix(),
            contract_version: default_contract_version(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Defaults to `~/.ticketsmith/idempotency.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("idempotency.json"))
    }
}

/// Tool names are blocked when they contain any listed substring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_universal_blocklist")]
    pub universal_blocklist: Vec<String>,

    #[serde(default = "default_orchestrator_blocklist")]
    pub orchestrator_blocklist: Vec<String>,

    #[serde(default = "default_reviewer_blocklist")]
    pub reviewer_blocklist: Vec<String>,

    /// Capability roles whose tools are hidden from the scaffolder
    #[serde(default)]
    pub orchestrator_blocked_roles: Vec<CapabilityRole>,

    /// Capability roles whose tools are hidden from the reviewer
    #[serde(default)]
    pub reviewer_blocked_roles: Vec<CapabilityRole>,
}

fn default_universal_blocklist() -> Vec<String> {
    vec!["delete_project".into(), "delete_repository".into(), "delete_group".into()]
}
fn default_orchestrator_blocklist() -> Vec<String> {
    vec![
        "delete_branch".into(),
        "delete_repository".into(),
        "merge_merge_request".into(),
        "accept_merge_request".into(),
        "approve_merge_request".into(),
    ]
}
fn default_reviewer_blocklist() -> Vec<String> {
    vec![
        "delete_branch".into(),
        "delete_repository".into(),
        "create_branch".into(),
        "create_commit".into(),
        "commit_changes".into(),
        "merge_merge_request".into(),
        "accept_merge_request".into(),
    ]
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            universal_blocklist: default_universal_blocklist(),
            orchestrator_blocklist: default_orchestrator_blocklist(),
            reviewer_blocklist: default_reviewer_blocklist(),
            orchestrator_blocked_roles: vec![],
            reviewer_blocked_roles: vec![],
        }
    }
}

impl SafetyConfig {
    pub fn blocklist_for(&self, role: AgentRole) -> &[String] {
        match role {
            AgentRole::Orchestrator => &self.orchestrator_blocklist,
            AgentRole::Reviewer => &self.reviewer_blocklist,
        }
    }

    pub fn blocked_roles_for(&self, role: AgentRole) -> &[CapabilityRole] {
        match role {
            AgentRole::Orchestrator => &self.orchestrator_blocked_roles,
            AgentRole::Reviewer => &self.reviewer_blocked_roles,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ticketsmith/config.toml)
    /// and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, apply environment overrides, then validate.
    pub fn load_with_overrides(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    ///
    /// - `TICKETSMITH_SCAFFOLD_MODELS` / `TICKETSMITH_REVIEW_MODELS`: comma-separated
    /// - `TICKETSMITH_STORE_PATH`
    /// - `<PROVIDER>_API_KEY` for every configured or well-known provider
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(models) = lookup("TICKETSMITH_SCAFFOLD_MODELS") {
            self.scaffolder.priority_models = split_list(&models);
        }
        if let Some(models) = lookup("TICKETSMITH_REVIEW_MODELS") {
            self.reviewer.priority_models = split_list(&models);
        }
        if let Some(path) = lookup("TICKETSMITH_STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }

        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.extend(WELL_KNOWN_PROVIDERS.iter().map(|s| s.to_string()));
        for name in names {
            let var = format!("{}_API_KEY", name.to_ascii_uppercase().replace('-', "_"));
            if let Some(key) = lookup(&var) {
                let entry = self.providers.entry(name).or_default();
                if entry.api_key.is_none() {
                    entry.api_key = Some(key);
                }
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ticketsmith")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.reasoning.temperature) {
            return Err(ConfigError::ValidationError(
                "reasoning.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.reasoning.candidate_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "reasoning.candidate_timeout_secs must be > 0".into(),
            ));
        }

        for (section, settings) in [("scaffolder", &self.scaffolder), ("reviewer", &self.reviewer)] {
            if settings.max_iterations == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{section}.max_iterations must be >= 1"
                )));
            }
            if let Some(bad) = settings
                .priority_models
                .iter()
                .find(|m| ModelId::parse(m).is_err())
            {
                return Err(ConfigError::ValidationError(format!(
                    "{section}.priority_models entry '{bad}' is not of the form provider:model"
                )));
            }
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        Self::default().to_toml()
    }

    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            providers: BTreeMap::new(),
            scaffolder: AgentSettings::scaffolder(),
            reviewer: AgentSettings::reviewer(),
            reasoning: ReasoningConfig::default(),
            tracker: TrackerConfig::default(),
            scaffolding: ScaffoldingConfig::default(),
            store: StoreConfig::default(),
            safety: SafetyConfig::default(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scaffolder.max_iterations, 5);
        assert_eq!(config.tracker.in_review_status, "In Review");
        assert_eq!(config.scaffolding.default_target_branch, "main");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = config.to_toml();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.scaffolder.priority_models, config.scaffolder.priority_models);
        assert_eq!(parsed.safety.universal_blocklist, config.safety.universal_blocklist);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.reasoning.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.reviewer.max_iterations = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reviewer.max_iterations"));
    }

    #[test]
    fn bare_model_name_rejected() {
        let mut config = AppConfig::default();
        config.scaffolder.priority_models = vec!["gpt-4o".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.reasoning.candidate_timeout_secs, 120);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[scaffolder]
mode = "react"
priority_models = ["deepseek:deepseek-chat"]

[providers.deepseek]
api_url = "http://localhost:9000/v1"

[safety]
reviewer_blocked_roles = ["documentation"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.scaffolder.mode, ExecutionMode::React);
        assert_eq!(config.scaffolder.max_iterations, 5);
        assert_eq!(config.reviewer.mode, ExecutionMode::Deterministic);
        assert_eq!(
            config.safety.blocked_roles_for(AgentRole::Reviewer),
            &[CapabilityRole::Documentation]
        );
        assert_eq!(config.safety.blocklist_for(AgentRole::Orchestrator).len(), 5);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scaffolder\nmode = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("TICKETSMITH_SCAFFOLD_MODELS", "groq:llama-3, openai:gpt-4o-mini"),
            ("TICKETSMITH_STORE_PATH", "/var/lib/ticketsmith/keys.json"),
            ("DEEPSEEK_API_KEY", "sk-deep"),
        ]);
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(
            config.scaffolder.priority_models,
            vec!["groq:llama-3", "openai:gpt-4o-mini"]
        );
        assert_eq!(
            config.store.resolved_path(),
            PathBuf::from("/var/lib/ticketsmith/keys.json")
        );
        assert_eq!(config.providers["deepseek"].api_key.as_deref(), Some("sk-deep"));
        assert!(!config.providers.contains_key("openai"));
    }

    #[test]
    fn file_key_wins_over_env() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("from-file".into()),
                ..ProviderConfig::default()
            },
        );
        config.apply_env_overrides(|k| (k == "OPENAI_API_KEY").then(|| "from-env".to_string()));
        assert_eq!(config.providers["openai"].api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-secret-value".into()),
                ..ProviderConfig::default()
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }
}

//! Backend router: builds the reasoning gateway from configuration.
//!
//! Every configured provider, plus every well-known provider referenced by a
//! priority list, becomes an OpenAI-compatible backend keyed by its name.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use ticketsmith_config::{AppConfig, ProviderConfig};
use ticketsmith_core::ModelId;
use tracing::{debug, warn};

use crate::gateway::{GatewaySettings, ReasoningGateway};
use crate::openai_compat::OpenAiCompatProvider;

/// Build a gateway with one backend per provider name that appears in the
/// config's `[providers]` table or in either agent's priority list.
pub fn build_gateway(config: &AppConfig) -> ReasoningGateway {
    let settings = GatewaySettings::from(&config.reasoning);
    let default_timeout = settings.candidate_timeout;
    let mut gateway = ReasoningGateway::new(settings);

    for name in referenced_providers(config) {
        let fallback = ProviderConfig::default();
        let provider_config = config.providers.get(&name).unwrap_or(&fallback);

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(&name));
        let api_key = provider_config.api_key.clone().unwrap_or_default();
        if api_key.is_empty() && !is_local(&name) {
            warn!(provider = %name, "No API key configured; calls to this backend will fail");
        }

        let timeout = Duration::from_secs(provider_config.timeout_secs).min(default_timeout);
        debug!(provider = %name, base_url = %base_url, timeout_secs = timeout.as_secs(), "Registering backend");

        let backend = OpenAiCompatProvider::new(&name, base_url, api_key, timeout);
        gateway = gateway.with_backend_timeout(Arc::new(backend), timeout);
    }

    gateway
}

fn referenced_providers(config: &AppConfig) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = config.providers.keys().cloned().collect();
    for raw in config
        .scaffolder
        .priority_models
        .iter()
        .chain(&config.reviewer.priority_models)
    {
        if let Ok(id) = ModelId::parse(raw) {
            names.insert(id.provider);
        }
    }
    names
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send one chat-completion request to one model
//! and return the reply. Ranking, fallback, and output validation live in
//! the reasoning gateway, not here.

use crate::error::ProviderFailure;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single completion request for one concrete model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Model name as the backend knows it (provider prefix already stripped)
    pub model: String,

    pub messages: Vec<Message>,

    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Ask the backend for a JSON-object response
    #[serde(default)]
    pub json_mode: bool,
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub message: Message,

    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Every model backend (OpenAI-compatible endpoints, test doubles) implements
/// this trait. The gateway selects a backend by [`Provider::name`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider prefix this backend answers to (e.g. "openai", "deepseek").
    fn name(&self) -> &str;

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderFailure>;
}

//! Types shared by the reasoning gateway and its callers.

use crate::error::CandidateFailure;
use crate::message::ToolCall;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A model identifier of the form `provider:model`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelId {
    pub provider: String,
    pub model: String,
}

impl ModelId {
    /// Accepts `provider:model` and, for compatibility, `provider/model`.
    pub fn parse(raw: &str) -> Result<Self, CandidateFailure> {
        let raw = raw.trim();
        let split = raw.split_once(':').or_else(|| raw.split_once('/'));
        match split {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => Ok(Self {
                provider: provider.to_string(),
                model: model.to_string(),
            }),
            _ => Err(CandidateFailure::InvalidModelId {
                model: raw.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider, self.model)
    }
}

/// Ordered candidate list: per-call hints first, then the configured
/// priority list. A model id appears at most once (first occurrence wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedModels {
    candidates: Vec<String>,
}

impl RankedModels {
    pub fn new<I, S>(priority: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranked = Self::default();
        ranked.extend(priority);
        ranked
    }

    /// Put `hints` in front of the existing candidates.
    pub fn with_hints<I, S>(self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranked = Self::new(hints);
        ranked.extend(self.candidates);
        ranked
    }

    fn extend<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            let id = id.trim();
            if !id.is_empty() && !self.candidates.iter().any(|c| c == id) {
                self.candidates.push(id.to_string());
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// A prompt, optionally split into system instructions and user content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            system: None,
            user: text.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A target type for structured generation.
///
/// The JSON schema is derived with `schemars`; [`validate`](Self::validate)
/// adds semantic checks the schema cannot express.
pub trait StructuredOutput: DeserializeOwned + JsonSchema + Send + Sized {
    fn schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Self)).unwrap_or_default()
    }

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl StructuredOutput for serde_json::Value {}

/// One tool-mode reply: free content plus zero or more decoded tool calls.
#[derive(Debug, Clone)]
pub struct ToolTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    /// Candidate that produced this turn
    pub model: String,
}

impl ToolTurn {
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

//! Error types for the Ticketsmith domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; [`Error`] aggregates them.

use thiserror::Error;

/// The top-level error type for all Ticketsmith operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Capability / backend failures ---
    #[error("Provider failure: {0}")]
    Provider(#[from] ProviderFailure),

    // --- Reasoning gateway ---
    #[error("Reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),

    // --- Idempotency store ---
    #[error("Idempotency store error: {0}")]
    Store(#[from] StoreError),

    // --- Mission parsing ---
    #[error("Mission error: {0}")]
    Mission(#[from] MissionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// The one failure kind raised by every capability method and model backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{system}: {message}")]
pub struct ProviderFailure {
    /// Originating system, e.g. `gitlab`, `jira`, `openai`.
    pub system: String,
    pub message: String,
    pub retryable: bool,
}

impl ProviderFailure {
    /// A transient failure (network, rate limit, 5xx).
    pub fn transient(system: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure that will not succeed on retry (bad request, auth, not found).
    pub fn permanent(system: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            message: message.into(),
            retryable: false,
        }
    }
}

/// Why a single model candidate was abandoned by the reasoning gateway.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandidateFailure {
    #[error("{model}: {failure}")]
    Provider {
        model: String,
        failure: ProviderFailure,
    },

    #[error("{model}: timed out after {timeout_secs}s")]
    Timeout { model: String, timeout_secs: u64 },

    #[error("{model}: returned empty content")]
    EmptyContent { model: String },

    #[error("{model}: output is not valid JSON: {reason}")]
    MalformedJson { model: String, reason: String },

    #[error("{model}: output failed schema validation: {reason}")]
    SchemaValidation { model: String, reason: String },

    #[error("{model}: no backend registered for provider '{provider}'")]
    UnknownBackend { model: String, provider: String },

    #[error("invalid model id '{model}', expected 'provider:model'")]
    InvalidModelId { model: String },
}

impl CandidateFailure {
    /// The candidate identifier this failure belongs to.
    pub fn model(&self) -> &str {
        match self {
            Self::Provider { model, .. }
            | Self::Timeout { model, .. }
            | Self::EmptyContent { model }
            | Self::MalformedJson { model, .. }
            | Self::SchemaValidation { model, .. }
            | Self::UnknownBackend { model, .. }
            | Self::InvalidModelId { model } => model,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReasoningError {
    #[error("All {attempts} model candidate(s) failed; last error: {last}")]
    Exhausted {
        attempts: usize,
        #[source]
        last: CandidateFailure,
    },

    #[error("No model candidates were supplied")]
    NoCandidates,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Fingerprint {0} is already recorded")]
    AlreadyRecorded(String),

    #[error("Store I/O failed: {0}")]
    Io(String),

    #[error("Store contents are corrupt: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MissionError {
    #[error("Mission {key} is missing required field '{field}'")]
    MissingField { key: String, field: String },

    #[error("Mission {key} has an invalid '{field}': {reason}")]
    InvalidField {
        key: String,
        field: String,
        reason: String,
    },
}

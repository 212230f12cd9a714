//! # Ticketsmith Core
//!
//! Domain types, traits, and error definitions for the Ticketsmith
//! orchestration engine. Nothing here talks to the network: every external
//! system is a trait, and implementations live in their own crates.
//!
//! ## Layout
//!
//! - [`mission`]: the tracker ticket as the engine sees it
//! - [`capability`]: version-control, tracker, and documentation ports
//! - [`provider`] / [`reasoning`]: model backends and the ranked-candidate types
//! - [`idempotency`]: fingerprints and the store trait
//! - [`context`]: the per-run context threaded through every call

pub mod capability;
pub mod context;
pub mod delivery;
pub mod error;
pub mod idempotency;
pub mod message;
pub mod mission;
pub mod provider;
pub mod reasoning;
pub mod review;

// Re-export key types at crate root for ergonomics
pub use capability::{
    Capabilities, Capability, CapabilityRole, Documentation, ToolSurface, Tracker, VersionControl,
};
pub use context::{AgentRole, ExecutionMode, RunContext};
pub use delivery::{ChangeType, CommitIntent, FileChange, FileContent, ScaffoldPlan};
pub use error::{
    CandidateFailure, Error, MissionError, ProviderFailure, ReasoningError, Result, StoreError,
};
pub use idempotency::{Fingerprint, IdempotencyStore, PriorResult};
pub use message::{Message, MessageToolCall, Role, ToolCall};
pub use mission::{CodeReviewParams, Description, Mission, MissionConfig};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use reasoning::{ModelId, Prompt, RankedModels, StructuredOutput, ToolTurn};
pub use review::{CodeReviewReport, ReviewComment, ReviewSeverity};

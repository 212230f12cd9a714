//! Security module for Ticketsmith: tool-safety filtering and secret redaction.
//!
//! Provides:
//! - **Tool safety**: per-agent blocklists applied to tool names and capability roles
//! - **Redaction**: scrubbing of credentials from logs and tracker comments

pub mod policy;
pub mod redact;

pub use policy::{SafetyVerdict, ToolSafetyPolicy};
pub use redact::{redact, Redactor};

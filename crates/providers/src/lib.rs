//! Reasoning gateway and LLM backends for Ticketsmith.
//!
//! Backends implement `ticketsmith_core::Provider`. The [`ReasoningGateway`]
//! walks a ranked candidate list over them, and [`router::build_gateway`]
//! assembles one from configuration.

pub mod gateway;
pub mod openai_compat;
pub mod router;
pub mod scripted;
pub mod structured;

pub use gateway::{GatewaySettings, ReasoningGateway};
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_gateway;
pub use scripted::{ScriptedCall, ScriptedProvider, ScriptedReply};

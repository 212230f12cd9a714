//! Agents for Ticketsmith: the ReAct loop engine and the agent facade.
//!
//! An [`Agent`] receives a mission and runs it either as a fixed workflow
//! (deterministic mode) or as a bounded **Thought → Action → Observation**
//! loop over the capability tools (react mode):
//!
//! 1. **Gather** tool schemas from every capability, filtered by the safety policy
//! 2. **Think**: one gateway call with the conversation and the tool list
//! 3. **Act**: execute every requested tool and append one observation per call
//! 4. **Repeat** until the model answers without tool calls or the cap is hit

pub mod facade;
pub mod react;

#[cfg(test)]
pub(crate) mod testing;

pub use facade::{Agent, AgentKind};
pub use react::{ReactLoop, ReactResult, TraceEntry};

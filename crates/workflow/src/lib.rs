//! Deterministic workflows for Ticketsmith.
//!
//! A workflow is a fixed list of steps run by the [`Sequencer`]. Steps either
//! succeed, stop early with a [`Halt`], or fail with a step-tagged error that
//! the sequencer reports to the tracker exactly once.

pub mod prompts;
pub mod review;
pub mod scaffold;
pub mod sequencer;
pub mod step;

#[cfg(test)]
pub(crate) mod testing;

pub use review::{review_fingerprint, ReviewSettings, ReviewWorkflow};
pub use scaffold::{branch_name, scaffold_fingerprint, ScaffoldSettings, ScaffoldWorkflow};
pub use sequencer::Sequencer;
pub use step::{AtStep, ExecutionError, Halt, RunOutcome, StepError, StepResult};

use async_trait::async_trait;
use ticketsmith_core::{AgentRole, Capabilities, Mission, RunContext};

/// A deterministic workflow over the three capability ports.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Human-readable flow name used in tracker comments.
    fn name(&self) -> &'static str;

    fn role(&self) -> AgentRole;

    async fn execute(
        &self,
        ctx: &RunContext,
        mission: &Mission,
        capabilities: &Capabilities,
    ) -> Result<RunOutcome, ExecutionError>;
}

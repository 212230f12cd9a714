//! Sequencer: runs one workflow's steps between a single session open and a
//! single session close, and reports the outcome to the tracker.
//!
//! The step list itself is one future that awaits each step in order; the
//! sequencer only owns the wrapping. A [`Halt`](crate::Halt) becomes one
//! informational comment (plus an optional status transition) and a normal
//! return. A step failure becomes exactly one failure comment, tagged with
//! the run id so it can be matched to the run's log lines, and an
//! [`ExecutionError`].

use std::future::Future;

use ticketsmith_core::{Capabilities, Error, RunContext};
use ticketsmith_security::redact;
use tracing::{error, info, warn};

use crate::step::{ExecutionError, Halt, RunOutcome, StepError, StepResult};

pub struct Sequencer<'a> {
    flow: &'static str,
    ctx: &'a RunContext,
    capabilities: &'a Capabilities,
}

impl<'a> Sequencer<'a> {
    /// The tracker is addressed by `ctx.mission_key`.
    pub fn new(flow: &'static str, ctx: &'a RunContext, capabilities: &'a Capabilities) -> Self {
        Self { flow, ctx, capabilities }
    }

    fn mission_key(&self) -> &str {
        &self.ctx.mission_key
    }

    /// Open sessions, await `steps`, report, close sessions. `steps` resolves
    /// to the completion summary.
    pub async fn run<F>(&self, steps: F) -> Result<RunOutcome, ExecutionError>
    where
        F: Future<Output = StepResult<String>> + Send,
    {
        if let Err(e) = self.capabilities.open_all().await {
            return Err(self.fail("connect", Error::Provider(e)).await);
        }

        let result = steps.await;
        let outcome = self.conclude(result).await;

        self.capabilities.close_all().await;
        outcome
    }

    async fn conclude(&self, result: StepResult<String>) -> Result<RunOutcome, ExecutionError> {
        match result {
            Ok(summary) => {
                info!(flow = self.flow, run_id = %self.ctx.run_id, mission = %self.mission_key(), "Workflow completed");
                Ok(RunOutcome::Completed { summary })
            }
            Err(StepError::Halt(halt)) => {
                self.halt(&halt).await;
                Ok(RunOutcome::Halted { message: halt.message })
            }
            Err(StepError::Failed { step, source }) => Err(self.fail(step, source).await),
        }
    }

    async fn halt(&self, halt: &Halt) {
        info!(
            flow = self.flow,
            run_id = %self.ctx.run_id,
            mission = %self.mission_key(),
            transition = ?halt.transition,
            "Workflow halted: {}",
            halt.message
        );
        self.comment(&halt.message).await;
        if let Some(status) = &halt.transition {
            if let Err(e) = self.capabilities.tracker.update_status(self.mission_key(), status).await {
                warn!(run_id = %self.ctx.run_id, mission = %self.mission_key(), status = %status, error = %e, "Failed to transition ticket after halt");
            }
        }
    }

    async fn fail(&self, step: &str, source: Error) -> ExecutionError {
        error!(
            flow = self.flow,
            run_id = %self.ctx.run_id,
            mission = %self.mission_key(),
            step,
            error = %source,
            "Workflow step failed"
        );
        let text = format!("{} failed at step '{step}': {source} (run {})", self.flow, self.ctx.run_id);
        self.comment(&text).await;
        ExecutionError {
            step: step.to_string(),
            mission_key: self.mission_key().to_string(),
            source,
        }
    }

    /// Report to the tracker; a failure to report is only logged.
    async fn comment(&self, text: &str) {
        let text = redact(text);
        if let Err(e) = self.capabilities.tracker.add_comment(self.mission_key(), &text).await {
            warn!(run_id = %self.ctx.run_id, mission = %self.mission_key(), error = %e, "Failed to post tracker comment");
        }
    }
}

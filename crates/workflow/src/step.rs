//! Step outcomes: success, halt, or a step-tagged failure.

use thiserror::Error;
use ticketsmith_core::Error;

/// An expected early stop. The run ends normally after the tracker gets one
/// informational comment, plus an optional status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halt {
    pub message: String,
    pub transition: Option<String>,
}

impl Halt {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transition: None,
        }
    }

    pub fn with_transition(mut self, status: impl Into<String>) -> Self {
        self.transition = Some(status.into());
        self
    }
}

#[derive(Debug)]
pub enum StepError {
    Halt(Halt),
    Failed { step: &'static str, source: Error },
}

impl From<Halt> for StepError {
    fn from(halt: Halt) -> Self {
        Self::Halt(halt)
    }
}

pub type StepResult<T> = Result<T, StepError>;

/// Tag any error with the step it happened in.
pub trait AtStep<T> {
    fn at(self, step: &'static str) -> StepResult<T>;
}

impl<T, E: Into<Error>> AtStep<T> for Result<T, E> {
    fn at(self, step: &'static str) -> StepResult<T> {
        self.map_err(|e| StepError::Failed {
            step,
            source: e.into(),
        })
    }
}

/// A failed run, after the tracker has been told.
#[derive(Debug, Error)]
#[error("{mission_key}: step '{step}' failed: {source}")]
pub struct ExecutionError {
    pub step: String,
    pub mission_key: String,
    #[source]
    pub source: Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { summary: String },
    Halted { message: String },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Completed { summary } => summary,
            Self::Halted { message } => message,
        }
    }
}

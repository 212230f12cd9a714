//! Per-run context threaded explicitly through every call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which safety profile an agent runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Scaffolder: may create branches and commits, never merge or approve
    Orchestrator,
    /// Reviewer: read-mostly, may publish review comments
    Reviewer,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Orchestrator => f.write_str("Orchestrator"),
            Self::Reviewer => f.write_str("Reviewer"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Fixed step pipeline
    #[default]
    Deterministic,
    /// Bounded think-act-observe loop
    #[serde(alias = "react_loop")]
    React,
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deterministic" => Ok(Self::Deterministic),
            "react" | "react_loop" => Ok(Self::React),
            other => Err(format!("unknown execution mode '{other}'")),
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deterministic => f.write_str("deterministic"),
            Self::React => f.write_str("react"),
        }
    }
}

/// Identity of one mission run. Owned by the run, never shared.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub agent: String,
    pub role: AgentRole,
    pub mission_key: String,
    pub started_at: DateTime<Utc>,
}

impl RunContext {
    pub fn new(agent: impl Into<String>, role: AgentRole, mission_key: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            agent: agent.into(),
            role,
            mission_key: mission_key.into(),
            started_at: Utc::now(),
        }
    }

    /// Span that every log line of this run is emitted under.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "run",
            run_id = %self.run_id,
            agent = %self.agent,
            mission = %self.mission_key,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_mode_parses_aliases() {
        assert_eq!("react_loop".parse::<ExecutionMode>().unwrap(), ExecutionMode::React);
        assert_eq!("Deterministic".parse::<ExecutionMode>().unwrap(), ExecutionMode::Deterministic);
        assert!("chaos".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn each_run_gets_a_fresh_id() {
        let a = RunContext::new("scaffolder", AgentRole::Orchestrator, "PROJ-1");
        let b = RunContext::new("scaffolder", AgentRole::Orchestrator, "PROJ-1");
        assert_ne!(a.run_id, b.run_id);
    }
}

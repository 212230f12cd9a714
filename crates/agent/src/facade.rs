//! Agent facade: one entry point per agent, dispatching on execution mode.
//!
//! Deterministic mode runs the agent's [`Workflow`]. React mode runs the
//! [`ReactLoop`] between the same session open/close and tracker reporting
//! used by the workflows, so both paths comment exactly once on failure.

use std::sync::Arc;

use ticketsmith_config::{AgentSettings, AppConfig};
use ticketsmith_core::{
    AgentRole, Capabilities, ExecutionMode, IdempotencyStore, Mission, RankedModels, RunContext,
};
use ticketsmith_providers::ReasoningGateway;
use ticketsmith_security::ToolSafetyPolicy;
use ticketsmith_tools::ToolRouter;
use ticketsmith_workflow::{
    scaffold_fingerprint, AtStep, ExecutionError, Halt, ReviewSettings, ReviewWorkflow, RunOutcome,
    ScaffoldSettings, ScaffoldWorkflow, Sequencer, StepResult, Workflow,
};
use tracing::{info, Instrument};

use crate::react::ReactLoop;

const SCAFFOLDER_PROMPT: &str = "\
You are the scaffolding agent. Turn the mission into a new service on its own branch.
Work through the tools:
1. Read the architecture guidance for the service.
2. Call validate_branch_existence before create_branch. If the branch already exists, \
add a comment to the ticket and stop.
3. Create the branch from the target branch, commit every file with a conventional-commit \
message, then open a merge request.
4. Comment on the ticket with the merge request link and move it to review.
Never merge, approve or delete anything. Finish with a short summary and no tool calls.";

const REVIEWER_PROMPT: &str = "\
You are the code review agent. Review the merge request named in the mission.
Work through the tools:
1. Check that the merge request is still open and read its diff.
2. Read the original code of the touched files and the project conventions.
3. Publish one review. Classify findings as CRITICAL, WARNING or SUGGESTION. \
Never approve a change that has a CRITICAL finding.
4. Comment on the ticket with the verdict.
Do not modify the repository. Finish with a short summary and no tool calls.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Scaffolder,
    Reviewer,
}

impl AgentKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Scaffolder => "scaffolder",
            Self::Reviewer => "reviewer",
        }
    }

    pub fn role(self) -> AgentRole {
        match self {
            Self::Scaffolder => AgentRole::Orchestrator,
            Self::Reviewer => AgentRole::Reviewer,
        }
    }

    fn flow(self) -> &'static str {
        match self {
            Self::Scaffolder => "Agentic scaffolding",
            Self::Reviewer => "Agentic code review",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            Self::Scaffolder => SCAFFOLDER_PROMPT,
            Self::Reviewer => REVIEWER_PROMPT,
        }
    }
}

pub struct Agent {
    kind: AgentKind,
    settings: AgentSettings,
    config: Arc<AppConfig>,
    gateway: Arc<ReasoningGateway>,
    store: Arc<dyn IdempotencyStore>,
}

impl Agent {
    pub fn new(
        kind: AgentKind,
        config: Arc<AppConfig>,
        gateway: Arc<ReasoningGateway>,
        store: Arc<dyn IdempotencyStore>,
    ) -> Self {
        let settings = match kind {
            AgentKind::Scaffolder => config.scaffolder.clone(),
            AgentKind::Reviewer => config.reviewer.clone(),
        };
        Self {
            kind,
            settings,
            config,
            gateway,
            store,
        }
    }

    pub fn scaffolder(config: Arc<AppConfig>, gateway: Arc<ReasoningGateway>, store: Arc<dyn IdempotencyStore>) -> Self {
        Self::new(AgentKind::Scaffolder, config, gateway, store)
    }

    pub fn reviewer(config: Arc<AppConfig>, gateway: Arc<ReasoningGateway>, store: Arc<dyn IdempotencyStore>) -> Self {
        Self::new(AgentKind::Reviewer, config, gateway, store)
    }

    /// Override the configured execution mode.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.settings.mode = mode;
        self
    }

    /// Override the configured ranked model list.
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.priority_models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn mode(&self) -> ExecutionMode {
        self.settings.mode
    }

    fn models(&self) -> RankedModels {
        RankedModels::new(self.settings.priority_models.iter().cloned())
    }

    /// Run one mission. Every log line is emitted inside the run's span.
    pub async fn run(&self, mission: &Mission, capabilities: &Capabilities) -> Result<RunOutcome, ExecutionError> {
        let ctx = RunContext::new(self.kind.name(), self.kind.role(), mission.key.clone());
        let span = ctx.span();
        async {
            info!(mode = %self.settings.mode, "Mission received");
            match self.settings.mode {
                ExecutionMode::Deterministic => self.workflow().execute(&ctx, mission, capabilities).await,
                ExecutionMode::React => self.run_agentic(&ctx, mission, capabilities).await,
            }
        }
        .instrument(span)
        .await
    }

    fn workflow(&self) -> Box<dyn Workflow> {
        match self.kind {
            AgentKind::Scaffolder => Box::new(ScaffoldWorkflow::new(
                self.gateway.clone(),
                self.store.clone(),
                self.models(),
                ScaffoldSettings::from(self.config.as_ref()),
            )),
            AgentKind::Reviewer => Box::new(ReviewWorkflow::new(
                self.gateway.clone(),
                self.store.clone(),
                self.models(),
                ReviewSettings::from(self.config.as_ref()),
            )),
        }
    }

    async fn run_agentic(
        &self,
        ctx: &RunContext,
        mission: &Mission,
        capabilities: &Capabilities,
    ) -> Result<RunOutcome, ExecutionError> {
        Sequencer::new(self.kind.flow(), ctx, capabilities)
            .run(self.agentic_steps(mission, capabilities))
            .await
    }

    async fn agentic_steps(&self, mission: &Mission, capabilities: &Capabilities) -> StepResult<String> {
        let key = mission.key.as_str();
        if self.kind == AgentKind::Scaffolder {
            let fingerprint = scaffold_fingerprint(mission, &self.config.scaffolding.contract_version);
            if let Some(prior) = self.store.lookup(&fingerprint).await.at("check_idempotency")? {
                return Err(Halt::new(format!("Scaffolding for {key} already completed: {prior}")).into());
            }
        }

        let policy = ToolSafetyPolicy::from_config(&self.config.safety, self.kind.role());
        let router = ToolRouter::build(capabilities, &policy).await.at("build_tools")?;

        let ranked = self.models().with_hints(mission.model_hints());
        let result = ReactLoop::new(self.gateway.clone())
            .with_max_iterations(self.settings.max_iterations)
            .run_loop(mission, self.kind.system_prompt(), &router, &ranked)
            .await
            .at("react_loop")?;

        let ending = if result.hit_cap {
            format!("stopped at the iteration cap ({})", result.iterations)
        } else {
            format!("finished after {} iteration(s)", result.iterations)
        };
        let answer = match result.answer.trim() {
            "" => "(no summary)",
            text => text,
        };
        let text = format!(
            "{} {ending} with {} tool call(s).\n{answer}",
            self.kind.flow(),
            result.tool_calls_made
        );
        capabilities
            .tracker
            .add_comment(key, &ticketsmith_security::redact(&text))
            .await
            .at("report_completion")?;

        Ok(result.answer)
    }
}

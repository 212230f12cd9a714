//! Scaffold workflow: ticket → branch, commit, merge request.
//!
//! Steps, strictly in order:
//! `parse`, `report_start`, `check_idempotency`, `fetch_docs`,
//! `generate_plan`, `create_branch`, `commit_changes`,
//! `create_merge_request`, `record`, `update_description`, `report_success`.
//!
//! Nothing touches version control before `check_idempotency` has consulted
//! the store; a hit halts the run.

use std::sync::Arc;

use async_trait::async_trait;
use ticketsmith_config::AppConfig;
use ticketsmith_core::{
    AgentRole, Capabilities, Error, Fingerprint, IdempotencyStore, Mission, MissionError,
    PriorResult, RankedModels, RunContext, ScaffoldPlan,
};
use ticketsmith_providers::ReasoningGateway;
use tracing::{debug, info};

use crate::prompts::scaffold_prompt;
use crate::sequencer::Sequencer;
use crate::step::{AtStep, ExecutionError, Halt, RunOutcome, StepError, StepResult};
use crate::Workflow;

pub const FLOW_NAME: &str = "Scaffolding";

#[derive(Debug, Clone)]
pub struct ScaffoldSettings {
    pub branch_prefix: String,
    pub default_target_branch: String,
    pub contract_version: String,
    pub in_review_status: String,
}

impl From<&AppConfig> for ScaffoldSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            branch_prefix: config.scaffolding.branch_prefix.clone(),
            default_target_branch: config.scaffolding.default_target_branch.clone(),
            contract_version: config.scaffolding.contract_version.clone(),
            in_review_status: config.tracker.in_review_status.clone(),
        }
    }
}

impl Default for ScaffoldSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// `<prefix><key>-<service>`, both parts lower-cased and reduced to
/// `[a-z0-9-]`. Without a service name the suffix is `scaffolder`.
pub fn branch_name(prefix: &str, key: &str, service: &str) -> String {
    let service = match sanitize(service) {
        s if s.is_empty() => "scaffolder".to_string(),
        s => s,
    };
    format!("{prefix}{}-{service}", sanitize(key))
}

fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Fingerprint over the immutable inputs of a scaffold request.
pub fn scaffold_fingerprint(mission: &Mission, contract_version: &str) -> Fingerprint {
    Fingerprint::from_parts([
        "scaffold",
        mission.key.as_str(),
        contract_version,
        mission.description.config.version.as_str(),
        mission.description.raw_content.as_str(),
    ])
}

pub struct ScaffoldWorkflow {
    gateway: Arc<ReasoningGateway>,
    store: Arc<dyn IdempotencyStore>,
    models: RankedModels,
    settings: ScaffoldSettings,
}

/// Validated inputs produced by `parse`.
struct Request<'m> {
    mission: &'m Mission,
    project: &'m str,
    branch: String,
    target_branch: String,
    fingerprint: Fingerprint,
}

impl ScaffoldWorkflow {
    pub fn new(
        gateway: Arc<ReasoningGateway>,
        store: Arc<dyn IdempotencyStore>,
        models: RankedModels,
        settings: ScaffoldSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            models,
            settings,
        }
    }

    fn parse<'m>(&self, mission: &'m Mission) -> StepResult<Request<'m>> {
        if mission.key.trim().is_empty() {
            return Err(MissionError::MissingField {
                key: "<unknown>".into(),
                field: "key".into(),
            })
            .at("parse");
        }
        let target = &mission.description.config.target;
        let project = target.project_ref();
        if project.trim().is_empty() {
            return Err(MissionError::MissingField {
                key: mission.key.clone(),
                field: "target.gitlab_project_id".into(),
            })
            .at("parse");
        }
        let target_branch = target
            .default_branch
            .clone()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| self.settings.default_target_branch.clone());

        Ok(Request {
            mission,
            project,
            branch: branch_name(&self.settings.branch_prefix, &mission.key, mission.service_name()),
            target_branch,
            fingerprint: scaffold_fingerprint(mission, &self.settings.contract_version),
        })
    }

    async fn check_idempotency(&self, req: &Request<'_>, caps: &Capabilities) -> StepResult<()> {
        let key = &req.mission.key;
        if let Some(prior) = self.store.lookup(&req.fingerprint).await.at("check_idempotency")? {
            info!(mission = %key, fingerprint = %req.fingerprint, prior = %prior, "Scaffold already completed");
            return Err(Halt::new(format!("Scaffolding for {key} already completed: {prior}")).into());
        }
        if caps
            .vcs
            .validate_branch_existence(&req.branch)
            .await
            .at("check_idempotency")?
        {
            return Err(Halt::new(format!(
                "Branch '{}' already exists; skipping scaffolding for {key}.",
                req.branch
            ))
            .with_transition(self.settings.in_review_status.clone())
            .into());
        }
        Ok(())
    }

    async fn generate_plan(&self, req: &Request<'_>, architecture: &str) -> StepResult<ScaffoldPlan> {
        let prompt = scaffold_prompt(req.mission, architecture);
        let ranked = self.models.clone().with_hints(req.mission.model_hints());
        let plan: ScaffoldPlan = self
            .gateway
            .generate_structured(&prompt, &ranked)
            .await
            .at("generate_plan")?;
        if plan.files.is_empty() {
            return Err(StepError::Failed {
                step: "generate_plan",
                source: Error::Internal("the generated plan contains no files".into()),
            });
        }
        debug!(files = plan.files.len(), "Scaffold plan generated");
        Ok(plan)
    }

    async fn steps(&self, mission: &Mission, caps: &Capabilities) -> StepResult<String> {
        let req = self.parse(mission)?;
        let key = req.mission.key.as_str();

        caps.tracker
            .add_comment(key, &format!("Scaffolding started on branch '{}'.", req.branch))
            .await
            .at("report_start")?;

        self.check_idempotency(&req, caps).await?;

        let query = match req.mission.service_name() {
            "" => key,
            service => service,
        };
        let architecture = caps.docs.get_architecture_context(query).await.at("fetch_docs")?;

        let plan = self.generate_plan(&req, &architecture).await?;
        let title = format!("feat: Scaffolding {key}");
        let description = format!("{}\n\nGenerated for {key}.", plan.commit_message);
        let commit = plan.into_commit(req.branch.clone());

        caps.vcs
            .create_branch(&req.branch, &req.target_branch)
            .await
            .at("create_branch")?;
        let commit_id = caps.vcs.commit_changes(&commit).await.at("commit_changes")?;
        info!(mission = %key, commit = %commit_id, files = commit.files.len(), "Scaffold committed");

        let mr_url = caps
            .vcs
            .create_merge_request(&req.branch, &req.target_branch, &title, &description)
            .await
            .at("create_merge_request")?;

        self.store
            .record(&req.fingerprint, PriorResult(mr_url.clone()))
            .await
            .at("record")?;

        let metadata = review_metadata(req.project, &req.branch, &mr_url);
        let updated = format!("{}\n\n{metadata}", req.mission.description.raw_content.trim_end());
        caps.tracker
            .update_task_description(key, &updated)
            .await
            .at("update_description")?;

        caps.tracker
            .add_comment(
                key,
                &format!(
                    "Scaffolding completed: {} file(s) on branch '{}'. Merge request: {mr_url}",
                    commit.files.len(),
                    req.branch
                ),
            )
            .await
            .at("report_success")?;
        caps.tracker
            .update_status(key, &self.settings.in_review_status)
            .await
            .at("report_success")?;

        Ok(mr_url)
    }
}

/// The block a later review run reads back from the ticket.
fn review_metadata(project: &str, branch: &str, mr_url: &str) -> String {
    format!(
        "---\ncode_review_params:\n  gitlab_project_id: \"{project}\"\n  source_branch_name: \"{branch}\"\n  \
         review_request_url: \"{mr_url}\"\n  generated_at: \"{}\"",
        chrono::Utc::now().to_rfc3339()
    )
}

#[async_trait]
impl Workflow for ScaffoldWorkflow {
    fn name(&self) -> &'static str {
        FLOW_NAME
    }

    fn role(&self) -> AgentRole {
        AgentRole::Orchestrator
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        mission: &Mission,
        capabilities: &Capabilities,
    ) -> Result<RunOutcome, ExecutionError> {
        Sequencer::new(FLOW_NAME, ctx, capabilities)
            .run(self.steps(mission, capabilities))
            .await
    }
}

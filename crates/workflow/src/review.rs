//! Review workflow: merge request → published review and ticket verdict.
//!
//! Steps: `parse`, `report_start`, `validate_branch`,
//! `validate_merge_request`, `fetch_code`, `check_idempotency`,
//! `fetch_conventions`, `analyze`, `publish_review`, `record`,
//! `report_verdict`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ticketsmith_config::AppConfig;
use ticketsmith_core::delivery::render_diff;
use ticketsmith_core::{
    AgentRole, Capabilities, CodeReviewParams, CodeReviewReport, Error, FileChange, FileContent,
    Fingerprint, IdempotencyStore, Mission, MissionError, PriorResult, RankedModels, ReviewSeverity,
    RunContext,
};
use ticketsmith_providers::ReasoningGateway;
use tracing::info;

use crate::prompts::review_prompt;
use crate::sequencer::Sequencer;
use crate::step::{AtStep, ExecutionError, Halt, RunOutcome, StepError, StepResult};
use crate::Workflow;

pub const FLOW_NAME: &str = "Code review";

#[derive(Debug, Clone)]
pub struct ReviewSettings {
    /// Branch the original code is read from
    pub base_branch: String,
    pub done_status: String,
    pub changes_requested_status: String,
}

impl From<&AppConfig> for ReviewSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_branch: config.scaffolding.default_target_branch.clone(),
            done_status: config.tracker.done_status.clone(),
            changes_requested_status: config.tracker.changes_requested_status.clone(),
        }
    }
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

pub fn review_fingerprint(mission_key: &str, mr_iid: &str, diff: &[FileChange]) -> Fingerprint {
    Fingerprint::from_parts(["review", mission_key, mr_iid, render_diff(diff).as_str()])
}

pub struct ReviewWorkflow {
    gateway: Arc<ReasoningGateway>,
    store: Arc<dyn IdempotencyStore>,
    models: RankedModels,
    settings: ReviewSettings,
}

struct Snapshot {
    tree: String,
    original: Vec<FileContent>,
    diff: Vec<FileChange>,
}

impl ReviewWorkflow {
    pub fn new(
        gateway: Arc<ReasoningGateway>,
        store: Arc<dyn IdempotencyStore>,
        models: RankedModels,
        settings: ReviewSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            models,
            settings,
        }
    }

    fn parse<'m>(mission: &'m Mission) -> StepResult<(&'m CodeReviewParams, String)> {
        let params = mission.code_review_params().at("parse")?;
        params.validate(&mission.key).at("parse")?;
        let iid = params.merge_request_iid(&mission.key).at("parse")?;
        Ok((params, iid))
    }

    async fn fetch_code(&self, params: &CodeReviewParams, iid: &str, caps: &Capabilities) -> StepResult<Snapshot> {
        let project = params.gitlab_project_id.as_str();
        let tree = caps
            .vcs
            .get_repository_tree(project, &params.source_branch_name)
            .await
            .at("fetch_code")?;
        let diff = caps.vcs.get_updated_code_diff(iid).await.at("fetch_code")?;
        if diff.is_empty() {
            return Err(StepError::Failed {
                step: "fetch_code",
                source: Error::Internal(format!("merge request !{iid} has no changes")),
            });
        }

        let touched: HashSet<&str> = diff
            .iter()
            .flat_map(|c| std::iter::once(c.file_path.as_str()).chain(c.old_path.as_deref()))
            .collect();
        let original = caps
            .vcs
            .get_original_branch_code(project, &self.settings.base_branch)
            .await
            .at("fetch_code")?
            .into_iter()
            .filter(|f| touched.contains(f.path.as_str()))
            .collect();

        Ok(Snapshot { tree, original, diff })
    }

    async fn steps(&self, mission: &Mission, caps: &Capabilities) -> StepResult<String> {
        let (params, iid) = Self::parse(mission)?;
        let key = mission.key.as_str();

        caps.tracker
            .add_comment(key, &format!("Code review started for merge request !{iid}."))
            .await
            .at("report_start")?;

        let branch = params.source_branch_name.as_str();
        if !caps.vcs.validate_branch_existence(branch).await.at("validate_branch")? {
            return Err(MissionError::InvalidField {
                key: key.to_string(),
                field: "code_review_params.source_branch_name".into(),
                reason: format!("branch '{branch}' does not exist"),
            })
            .at("validate_branch");
        }

        if !caps
            .vcs
            .validate_merge_request_existence(&iid)
            .await
            .at("validate_merge_request")?
        {
            return Err(Halt::new(format!("Merge request !{iid} is not open; nothing to review for {key}.")).into());
        }

        let snapshot = self.fetch_code(params, &iid, caps).await?;

        let fingerprint = review_fingerprint(key, &iid, &snapshot.diff);
        if let Some(prior) = self.store.lookup(&fingerprint).await.at("check_idempotency")? {
            info!(mission = %key, fingerprint = %fingerprint, "Review already published for this diff");
            return Err(Halt::new(format!("Review of !{iid} for {key} was already published: {prior}")).into());
        }

        let service = match mission.service_name() {
            "" => key,
            service => service,
        };
        let conventions = caps.docs.get_project_context(service).await.at("fetch_conventions")?;

        let prompt = review_prompt(
            mission,
            params,
            &snapshot.tree,
            &snapshot.original,
            &snapshot.diff,
            &conventions,
        );
        let ranked = self.models.clone().with_hints(mission.model_hints());
        let report: CodeReviewReport = self
            .gateway
            .generate_structured(&prompt, &ranked)
            .await
            .at("analyze")?;

        caps.vcs.publish_review(&iid, &report).await.at("publish_review")?;
        self.store
            .record(&fingerprint, PriorResult(params.review_request_url.clone()))
            .await
            .at("record")?;

        let (verdict, status) = if report.is_approved() {
            ("approved", &self.settings.done_status)
        } else {
            ("changes requested", &self.settings.changes_requested_status)
        };
        caps.tracker
            .add_comment(key, &verdict_comment(&iid, verdict, &report))
            .await
            .at("report_verdict")?;
        caps.tracker.update_status(key, status).await.at("report_verdict")?;

        info!(mission = %key, mr = %iid, verdict, issues = report.comments().len(), "Review published");
        Ok(format!("Merge request !{iid}: {verdict}"))
    }
}

fn verdict_comment(iid: &str, verdict: &str, report: &CodeReviewReport) -> String {
    format!(
        "Code review of !{iid}: {verdict}.\n{}\nCritical: {}, warnings: {}, suggestions: {}.",
        report.summary(),
        report.count(ReviewSeverity::Critical),
        report.count(ReviewSeverity::Warning),
        report.count(ReviewSeverity::Suggestion),
    )
}

#[async_trait]
impl Workflow for ReviewWorkflow {
    fn name(&self) -> &'static str {
        FLOW_NAME
    }

    fn role(&self) -> AgentRole {
        AgentRole::Reviewer
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

//! Journaling adapters: in-process version-control and tracker ports.
//!
//! They keep just enough state to behave like the real systems (branches,
//! open merge requests, ticket comments) and write every call to a shared
//! [`Journal`]. Failures can be injected per operation.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use ticketsmith_core::delivery::render_diff;
use ticketsmith_core::{
    CapabilityRole, CodeReviewReport, CommitIntent, FileChange, FileContent, ProviderFailure,
    ToolDefinition, ToolSurface, Tracker, VersionControl,
};

use crate::args::{optional_str, required_id, required_str, typed, unknown_tool};

pub const VCS_SYSTEM: &str = "gitlab";
pub const TRACKER_SYSTEM: &str = "jira";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub system: String,
    pub operation: String,
    pub detail: String,
    /// Whether the call changed state in the external system
    pub side_effect: bool,
}

impl fmt::Display for JournalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.side_effect { "*" } else { " " };
        write!(f, "{marker} [{}] {} {}", self.system, self.operation, self.detail)
    }
}

/// Shared, append-only call log. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, system: &str, operation: &str, detail: impl Into<String>, side_effect: bool) {
        lock(&self.entries).push(JournalEntry {
            system: system.to_string(),
            operation: operation.to_string(),
            detail: detail.into(),
            side_effect,
        });
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        lock(&self.entries).clone()
    }

    pub fn side_effects(&self) -> Vec<JournalEntry> {
        lock(&self.entries).iter().filter(|e| e.side_effect).cloned().collect()
    }

    /// Number of entries for `operation`.
    pub fn count(&self, operation: &str) -> usize {
        lock(&self.entries).iter().filter(|e| e.operation == operation).count()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-operation failure injection.
#[derive(Default)]
struct Faults(Mutex<HashMap<String, ProviderFailure>>);

impl Faults {
    fn set(&mut self, operation: &str, failure: ProviderFailure) {
        self.0
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation.to_string(), failure);
    }

    fn check(&self, operation: &str) -> Result<(), ProviderFailure> {
        match lock(&self.0).get(operation) {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

fn tool(name: &str, description: &str, properties: serde_json::Value, required: &[&str]) -> ToolDefinition {
    ToolDefinition {
        name: name.into(),
        description: description.into(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

// --- Version control ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeRequestRecord {
    pub iid: String,
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
    pub url: String,
}

#[derive(Default)]
struct VcsState {
    branches: BTreeSet<String>,
    open_merge_requests: BTreeSet<String>,
    next_mr_iid: u64,
    commits: Vec<CommitIntent>,
    merge_requests: Vec<MergeRequestRecord>,
    reviews: Vec<(String, CodeReviewReport)>,
    tree: Option<String>,
    original_code: Vec<FileContent>,
    diff: Vec<FileChange>,
}

pub struct JournalVcs {
    journal: Journal,
    base_url: String,
    state: Mutex<VcsState>,
    faults: Faults,
}

impl JournalVcs {
    /// A repository with a single `main` branch.
    pub fn new(journal: Journal) -> Self {
        let state = VcsState {
            branches: BTreeSet::from(["main".to_string()]),
            next_mr_iid: 1,
            ..Default::default()
        };
        Self {
            journal,
            base_url: "https://gitlab.local/group/project".into(),
            state: Mutex::new(state),
            faults: Faults::default(),
        }
    }

    fn state_mut(&mut self) -> &mut VcsState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.state_mut().branches.insert(branch.into());
        self
    }

    pub fn with_open_merge_request(mut self, iid: impl Into<String>) -> Self {
        self.state_mut().open_merge_requests.insert(iid.into());
        self
    }

    pub fn with_tree(mut self, tree: impl Into<String>) -> Self {
        self.state_mut().tree = Some(tree.into());
        self
    }

    pub fn with_original_code(mut self, files: Vec<FileContent>) -> Self {
        self.state_mut().original_code = files;
        self
    }

    pub fn with_diff(mut self, diff: Vec<FileChange>) -> Self {
        self.state_mut().diff = diff;
        self
    }

    /// Make every call to `operation` fail with a transient failure.
    pub fn fail_on(mut self, operation: &str, message: &str) -> Self {
        self.faults.set(operation, ProviderFailure::transient(VCS_SYSTEM, message));
        self
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn commits(&self) -> Vec<CommitIntent> {
        lock(&self.state).commits.clone()
    }

    pub fn merge_requests(&self) -> Vec<MergeRequestRecord> {
        lock(&self.state).merge_requests.clone()
    }

    pub fn published_reviews(&self) -> Vec<(String, CodeReviewReport)> {
        lock(&self.state).reviews.clone()
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        lock(&self.state).branches.contains(branch)
    }

    fn read(&self, operation: &str, detail: impl Into<String>) {
        self.journal.push(VCS_SYSTEM, operation, detail, false);
    }

    fn effect(&self, operation: &str, detail: impl Into<String>) {
        self.journal.push(VCS_SYSTEM, operation, detail, true);
    }

    async fn delete_branch(&self, branch: &str) -> Result<(), ProviderFailure> {
        self.faults.check("delete_branch")?;
        if !lock(&self.state).branches.remove(branch) {
            return Err(ProviderFailure::permanent(VCS_SYSTEM, format!("branch '{branch}' not found")));
        }
        self.effect("delete_branch", branch);
        Ok(())
    }

    async fn merge_merge_request(&self, iid: &str) -> Result<(), ProviderFailure> {
        self.faults.check("merge_merge_request")?;
        if !lock(&self.state).open_merge_requests.remove(iid) {
            return Err(ProviderFailure::permanent(VCS_SYSTEM, format!("merge request !{iid} is not open")));
        }
        self.effect("merge_merge_request", format!("!{iid}"));
        Ok(())
    }
}

#[async_trait]
impl ToolSurface for JournalVcs {
    fn role(&self) -> CapabilityRole {
        CapabilityRole::VersionControl
    }

    fn system(&self) -> &str {
        VCS_SYSTEM
    }

    async fn connect(&self) -> Result<(), ProviderFailure> {
        self.faults.check("connect")?;
        self.read("connect", "");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ProviderFailure> {
        self.read("disconnect", "");
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ProviderFailure> {
        Ok(vec![
            tool(
                "validate_branch_existence",
                "Check whether a branch exists in the repository.",
                json!({"branch_name": {"type": "string"}}),
                &["branch_name"],
            ),
            tool(
                "create_branch",
                "Create a branch from a ref.",
                json!({"branch_name": {"type": "string"}, "ref": {"type": "string"}}),
                &["branch_name", "ref"],
            ),
            tool(
                "commit_changes",
                "Commit files to a branch in one commit.",
                json!({
                    "branch_name": {"type": "string"},
                    "commit_message": {"type": "string"},
                    "files": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {"path": {"type": "string"}, "content": {"type": "string"}},
                            "required": ["path", "content"]
                        }
                    }
                }),
                &["branch_name", "commit_message", "files"],
            ),
            tool(
                "create_merge_request",
                "Open a merge request and return its URL.",
                json!({
                    "source_branch": {"type": "string"},
                    "target_branch": {"type": "string"},
                    "title": {"type": "string"},
                    "description": {"type": "string"}
                }),
                &["source_branch", "target_branch", "title"],
            ),
            tool(
                "validate_merge_request_existence",
                "Check whether a merge request is open.",
                json!({"mr_iid": {"type": "string"}}),
                &["mr_iid"],
            ),
            tool(
                "get_repository_tree",
                "List the files of a branch.",
                json!({"project_id": {"type": "string"}, "branch": {"type": "string"}}),
                &["branch"],
            ),
            tool(
                "get_original_branch_code",
                "Return the content of the files on a branch.",
                json!({"project_id": {"type": "string"}, "branch": {"type": "string"}}),
                &["branch"],
            ),
            tool(
                "get_merge_request_diff",
                "Return the diff of a merge request.",
                json!({"mr_iid": {"type": "string"}}),
                &["mr_iid"],
            ),
            tool(
                "publish_review",
                "Publish a code review report on a merge request.",
                json!({"mr_iid": {"type": "string"}, "report": {"type": "object"}}),
                &["mr_iid", "report"],
            ),
            tool(
                "delete_branch",
                "Delete a branch.",
                json!({"branch_name": {"type": "string"}}),
                &["branch_name"],
            ),
            tool(
                "merge_merge_request",
                "Merge an open merge request.",
                json!({"mr_iid": {"type": "string"}}),
                &["mr_iid"],
            ),
        ])
    }

    async fn execute_tool(&self, name: &str, args: serde_json::Value) -> Result<String, ProviderFailure> {
        let s = VCS_SYSTEM;
        match name {
            "validate_branch_existence" => {
                let branch = required_str(s, &args, "branch_name")?;
                let exists = self.validate_branch_existence(branch).await?;
                Ok(json!({"branch": branch, "exists": exists}).to_string())
            }
            "create_branch" => {
                let branch = required_str(s, &args, "branch_name")?;
                let from = optional_str(&args, "ref").unwrap_or("main");
                self.create_branch(branch, from).await
            }
            "commit_changes" => {
                let intent = CommitIntent::new(
                    required_str(s, &args, "branch_name")?,
                    required_str(s, &args, "commit_message")?,
                    typed(s, &args, "files")?,
                );
                let id = self.commit_changes(&intent).await?;
                Ok(json!({"commit_id": id}).to_string())
            }
            "create_merge_request" => {
                self.create_merge_request(
                    required_str(s, &args, "source_branch")?,
                    required_str(s, &args, "target_branch")?,
                    required_str(s, &args, "title")?,
                    optional_str(&args, "description").unwrap_or_default(),
                )
                .await
            }
            "validate_merge_request_existence" => {
                let iid = required_id(s, &args, "mr_iid")?;
                let exists = self.validate_merge_request_existence(&iid).await?;
                Ok(json!({"mr_iid": iid, "exists": exists}).to_string())
            }
            "get_repository_tree" => {
                let project = optional_str(&args, "project_id").unwrap_or_default();
                self.get_repository_tree(project, required_str(s, &args, "branch")?).await
            }
            "get_original_branch_code" => {
                let project = optional_str(&args, "project_id").unwrap_or_default();
                let files = self
                    .get_original_branch_code(project, required_str(s, &args, "branch")?)
                    .await?;
                serde_json::to_string(&files).map_err(|e| ProviderFailure::permanent(s, e.to_string()))
            }
            "get_merge_request_diff" => {
                let changes = self.get_updated_code_diff(&required_id(s, &args, "mr_iid")?).await?;
                Ok(render_diff(&changes))
            }
            "publish_review" => {
                let iid = required_id(s, &args, "mr_iid")?;
                let report: CodeReviewReport = typed(s, &args, "report")?;
                self.publish_review(&iid, &report).await?;
                Ok(format!("Review published on !{iid}"))
            }
            "delete_branch" => {
                let branch = required_str(s, &args, "branch_name")?;
                self.delete_branch(branch).await?;
                Ok(format!("Branch '{branch}' deleted"))
            }
            "merge_merge_request" => {
                let iid = required_id(s, &args, "mr_iid")?;
                self.merge_merge_request(&iid).await?;
                Ok(format!("Merge request !{iid} merged"))
            }
            other => Err(unknown_tool(s, other)),
        }
    }
}

#[async_trait]
impl VersionControl for JournalVcs {
    async fn validate_branch_existence(&self, branch: &str) -> Result<bool, ProviderFailure> {
        self.faults.check("validate_branch_existence")?;
        let exists = lock(&self.state).branches.contains(branch);
        self.read("validate_branch_existence", format!("{branch} -> {exists}"));
        Ok(exists)
    }

    async fn create_branch(&self, branch: &str, from_ref: &str) -> Result<String, ProviderFailure> {
        self.faults.check("create_branch")?;
        if !lock(&self.state).branches.insert(branch.to_string()) {
            return Err(ProviderFailure::permanent(VCS_SYSTEM, format!("branch '{branch}' already exists")));
        }
        self.effect("create_branch", format!("{branch} from {from_ref}"));
        Ok(format!("{}/-/tree/{branch}", self.base_url))
    }

    async fn commit_changes(&self, intent: &CommitIntent) -> Result<String, ProviderFailure> {
        self.faults.check("commit_changes")?;
        {
            let mut state = lock(&self.state);
            if !state.branches.contains(&intent.branch) {
                return Err(ProviderFailure::permanent(
                    VCS_SYSTEM,
                    format!("branch '{}' not found", intent.branch),
                ));
            }
            if intent.is_empty() {
                return Err(ProviderFailure::permanent(VCS_SYSTEM, "nothing to commit"));
            }
            state.commits.push(intent.clone());
        }
        let mut id = uuid::Uuid::new_v4().simple().to_string();
        id.truncate(12);
        self.effect("commit_changes", format!("{}: {} file(s)", intent.branch, intent.files.len()));
        Ok(id)
    }

    async fn create_merge_request(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        description: &str,
    ) -> Result<String, ProviderFailure> {
        self.faults.check("create_merge_request")?;
        let url = {
            let mut state = lock(&self.state);
            if !state.branches.contains(source_branch) {
                return Err(ProviderFailure::permanent(
                    VCS_SYSTEM,
                    format!("source branch '{source_branch}' not found"),
                ));
            }
            let iid = state.next_mr_iid.to_string();
            state.next_mr_iid += 1;
            let url = format!("{}/-/merge_requests/{iid}", self.base_url);
            state.open_merge_requests.insert(iid.clone());
            state.merge_requests.push(MergeRequestRecord {
                iid,
                source_branch: source_branch.into(),
                target_branch: target_branch.into(),
                title: title.into(),
                description: description.into(),
                url: url.clone(),
            });
            url
        };
        self.effect("create_merge_request", format!("{source_branch} -> {target_branch}: {title}"));
        Ok(url)
    }

    async fn validate_merge_request_existence(&self, mr_iid: &str) -> Result<bool, ProviderFailure> {
        self.faults.check("validate_merge_request_existence")?;
        let open = lock(&self.state).open_merge_requests.contains(mr_iid);
        self.read("validate_merge_request_existence", format!("!{mr_iid} -> {open}"));
        Ok(open)
    }

    async fn get_repository_tree(&self, project_id: &str, branch: &str) -> Result<String, ProviderFailure> {
        self.faults.check("get_repository_tree")?;
        let tree = {
            let state = lock(&self.state);
            match &state.tree {
                Some(tree) => tree.clone(),
                None => state
                    .original_code
                    .iter()
                    .map(|f| f.path.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            }
        };
        self.read("get_repository_tree", format!("{project_id}@{branch}"));
        Ok(tree)
    }

    async fn get_original_branch_code(
        &self,
        project_id: &str,
        branch: &str,
    ) -> Result<Vec<FileContent>, ProviderFailure> {
        self.faults.check("get_original_branch_code")?;
        let files = lock(&self.state).original_code.clone();
        self.read("get_original_branch_code", format!("{project_id}@{branch}: {} file(s)", files.len()));
        Ok(files)
    }

    async fn get_updated_code_diff(&self, mr_iid: &str) -> Result<Vec<FileChange>, ProviderFailure> {
        self.faults.check("get_updated_code_diff")?;
        let diff = lock(&self.state).diff.clone();
        self.read("get_updated_code_diff", format!("!{mr_iid}: {} change(s)", diff.len()));
        Ok(diff)
    }

    async fn publish_review(&self, mr_iid: &str, report: &CodeReviewReport) -> Result<(), ProviderFailure> {
        self.faults.check("publish_review")?;
        {
            let mut state = lock(&self.state);
            if !state.open_merge_requests.contains(mr_iid) {
                return Err(ProviderFailure::permanent(
                    VCS_SYSTEM,
                    format!("merge request !{mr_iid} not found"),
                ));
            }
            state.reviews.push((mr_iid.to_string(), report.clone()));
        }
        self.effect(
            "publish_review",
            format!("!{mr_iid}: approved={} issues={}", report.is_approved(), report.comments().len()),
        );
        Ok(())
    }
}

// --- Tracker ---

#[derive(Default)]
struct TrackerState {
    comments: Vec<(String, String)>,
    statuses: Vec<(String, String)>,
    descriptions: BTreeMap<String, String>,
}

pub struct JournalTracker {
    journal: Journal,
    state: Mutex<TrackerState>,
    faults: Faults,
}

impl JournalTracker {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            state: Mutex::new(TrackerState::default()),
            faults: Faults::default(),
        }
    }

    pub fn fail_on(mut self, operation: &str, message: &str) -> Self {
        self.faults.set(operation, ProviderFailure::transient(TRACKER_SYSTEM, message));
        self
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Every comment as `(key, text)`, oldest first.
    pub fn comments(&self) -> Vec<(String, String)> {
        lock(&self.state).comments.clone()
    }

    pub fn statuses(&self) -> Vec<(String, String)> {
        lock(&self.state).statuses.clone()
    }

    pub fn last_status(&self, key: &str) -> Option<String> {
        lock(&self.state)
            .statuses
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, s)| s.clone())
    }

    pub fn description(&self, key: &str) -> Option<String> {
        lock(&self.state).descriptions.get(key).cloned()
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[async_trait]
impl ToolSurface for JournalTracker {
    fn role(&self) -> CapabilityRole {
        CapabilityRole::Tracker
    }

    fn system(&self) -> &str {
        TRACKER_SYSTEM
    }

    async fn connect(&self) -> Result<(), ProviderFailure> {
        self.faults.check("connect")?;
        self.journal.push(TRACKER_SYSTEM, "connect", "", false);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ProviderFailure> {
        self.journal.push(TRACKER_SYSTEM, "disconnect", "", false);
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ProviderFailure> {
        Ok(vec![
            tool(
                "add_comment",
                "Add a comment to a ticket.",
                json!({"issue_key": {"type": "string"}, "comment": {"type": "string"}}),
                &["issue_key", "comment"],
            ),
            tool(
                "update_status",
                "Transition a ticket to a new status.",
                json!({"issue_key": {"type": "string"}, "status": {"type": "string"}}),
                &["issue_key", "status"],
            ),
            tool(
                "update_task_description",
                "Replace the description of a ticket.",
                json!({"issue_key": {"type": "string"}, "description": {"type": "string"}}),
                &["issue_key", "description"],
            ),
        ])
    }

    async fn execute_tool(&self, name: &str, args: serde_json::Value) -> Result<String, ProviderFailure> {
        let s = TRACKER_SYSTEM;
        if !matches!(name, "add_comment" | "update_status" | "update_task_description") {
            return Err(unknown_tool(s, name));
        }
        let key = required_str(s, &args, "issue_key")?;
        match name {
            "add_comment" => {
                self.add_comment(key, required_str(s, &args, "comment")?).await?;
                Ok(format!("Comment added to {key}"))
            }
            "update_status" => {
                let status = required_str(s, &args, "status")?;
                self.update_status(key, status).await?;
                Ok(format!("{key} moved to '{status}'"))
            }
            "update_task_description" => {
                self.update_task_description(key, required_str(s, &args, "description")?).await?;
                Ok(format!("Description of {key} updated"))
            }
            other => Err(unknown_tool(s, other)),
        }
    }
}

#[async_trait]
impl Tracker for JournalTracker {
    async fn add_comment(&self, key: &str, text: &str) -> Result<(), ProviderFailure> {
        self.faults.check("add_comment")?;
        lock(&self.state).comments.push((key.to_string(), text.to_string()));
        self.journal
            .push(TRACKER_SYSTEM, "add_comment", format!("{key}: {}", first_line(text)), true);
        Ok(())
    }

    async fn update_status(&self, key: &str, status: &str) -> Result<(), ProviderFailure> {
        self.faults.check("update_status")?;
        lock(&self.state).statuses.push((key.to_string(), status.to_string()));
        self.journal
            .push(TRACKER_SYSTEM, "update_status", format!("{key} -> {status}"), true);
        Ok(())
    }

    async fn update_task_description(&self, key: &str, text: &str) -> Result<(), ProviderFailure> {
        self.faults.check("update_task_description")?;
        lock(&self.state).descriptions.insert(key.to_string(), text.to_string());
        self.journal
            .push(TRACKER_SYSTEM, "update_task_description", key.to_string(), true);
        Ok(())
    }
}

//! Capability ports: the engine's only way to act on the outside world.
//!
//! There are exactly three roles: version control, tracker, documentation.
//! Each role trait extends [`ToolSurface`], which adds session management and
//! the two agentic methods (`list_tools`, `execute_tool`) the ReAct loop uses.
//! Every method is async and fails with one [`ProviderFailure`].

use crate::delivery::{CommitIntent, FileChange, FileContent};
use crate::error::ProviderFailure;
use crate::provider::ToolDefinition;
use crate::review::CodeReviewReport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// The closed set of capability roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityRole {
    VersionControl,
    Tracker,
    Documentation,
}

impl std::fmt::Display for CapabilityRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VersionControl => f.write_str("version_control"),
            Self::Tracker => f.write_str("tracker"),
            Self::Documentation => f.write_str("documentation"),
        }
    }
}

/// Session management plus the agentic tool surface shared by all roles.
#[async_trait]
pub trait ToolSurface: Send + Sync {
    fn role(&self) -> CapabilityRole;

    /// Backing system name used in failures and logs (e.g. "gitlab").
    fn system(&self) -> &str;

    async fn connect(&self) -> Result<(), ProviderFailure> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ProviderFailure> {
        Ok(())
    }

    /// Tool schemas this capability exposes to a model.
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ProviderFailure>;

    /// Run one tool by name; the returned text becomes the observation.
    async fn execute_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<String, ProviderFailure>;
}

#[async_trait]
pub trait VersionControl: ToolSurface {
    async fn validate_branch_existence(&self, branch: &str) -> Result<bool, ProviderFailure>;

    /// Returns the branch URL.
    async fn create_branch(&self, branch: &str, from_ref: &str) -> Result<String, ProviderFailure>;

    /// Returns the commit id.
    async fn commit_changes(&self, intent: &CommitIntent) -> Result<String, ProviderFailure>;

    /// Returns the merge request web URL.
    async fn create_merge_request(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        description: &str,
    ) -> Result<String, ProviderFailure>;

    /// False when the merge request is missing or no longer open.
    async fn validate_merge_request_existence(&self, mr_iid: &str) -> Result<bool, ProviderFailure>;

    /// A directory skeleton without file contents.
    async fn get_repository_tree(&self, project_id: &str, branch: &str) -> Result<String, ProviderFailure>;

    async fn get_original_branch_code(
        &self,
        project_id: &str,
        branch: &str,
    ) -> Result<Vec<FileContent>, ProviderFailure>;

    async fn get_updated_code_diff(&self, mr_iid: &str) -> Result<Vec<FileChange>, ProviderFailure>;

    async fn publish_review(&self, mr_iid: &str, report: &CodeReviewReport) -> Result<(), ProviderFailure>;
}

#[async_trait]
pub trait Tracker: ToolSurface {
    async fn add_comment(&self, key: &str, text: &str) -> Result<(), ProviderFailure>;

    async fn update_status(&self, key: &str, status: &str) -> Result<(), ProviderFailure>;

    async fn update_task_description(&self, key: &str, text: &str) -> Result<(), ProviderFailure>;
}

#[async_trait]
pub trait Documentation: ToolSurface {
    /// Architecture guidance for a page id or a free-text query.
    async fn get_architecture_context(&self, id_or_query: &str) -> Result<String, ProviderFailure>;

    async fn get_project_context(&self, service_name: &str) -> Result<String, ProviderFailure>;
}

/// One capability tagged with its role.
#[derive(Clone)]
pub enum Capability {
    VersionControl(Arc<dyn VersionControl>),
    Tracker(Arc<dyn Tracker>),
    Documentation(Arc<dyn Documentation>),
}

impl Capability {
    pub fn role(&self) -> CapabilityRole {
        match self {
            Self::VersionControl(_) => CapabilityRole::VersionControl,
            Self::Tracker(_) => CapabilityRole::Tracker,
            Self::Documentation(_) => CapabilityRole::Documentation,
        }
    }

    pub fn surface(&self) -> Arc<dyn ToolSurface> {
        match self {
            Self::VersionControl(c) => c.clone(),
            Self::Tracker(c) => c.clone(),
            Self::Documentation(c) => c.clone(),
        }
    }
}

/// The capability instances owned by one run.
#[derive(Clone)]
pub struct Capabilities {
    pub vcs: Arc<dyn VersionControl>,
    pub tracker: Arc<dyn Tracker>,
    pub docs: Arc<dyn Documentation>,
}

impl Capabilities {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        tracker: Arc<dyn Tracker>,
        docs: Arc<dyn Documentation>,
    ) -> Self {
        Self { vcs, tracker, docs }
    }

    pub fn all(&self) -> [Capability; 3] {
        [
            Capability::VersionControl(self.vcs.clone()),
            Capability::Tracker(self.tracker.clone()),
            Capability::Documentation(self.docs.clone()),
        ]
    }

    /// Open every session. On failure, sessions already opened are closed
    /// again before the error is returned.
    pub async fn open_all(&self) -> Result<(), ProviderFailure> {
        let all = self.all();
        for (i, cap) in all.iter().enumerate() {
            if let Err(e) = cap.surface().connect().await {
                for opened in &all[..i] {
                    close_one(opened).await;
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Close every session. Failures are logged, never raised.
    pub async fn close_all(&self) {
        for cap in self.all().iter() {
            close_one(cap).await;
        }
    }
}

async fn close_one(cap: &Capability) {
    let surface = cap.surface();
    if let Err(e) = surface.disconnect().await {
        warn!(system = %surface.system(), role = %cap.role(), error = %e, "Failed to close tool session");
    }
}

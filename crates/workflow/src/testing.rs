//! Shared test fixtures: journaling ports, an in-memory store and a
//! scripted model backend.

use std::sync::Arc;

use ticketsmith_core::{Capabilities, Mission, RankedModels};
use ticketsmith_providers::{GatewaySettings, ReasoningGateway, ScriptedProvider};
use ticketsmith_store::InMemoryStore;
use ticketsmith_tools::{FilesystemDocs, Journal, JournalTracker, JournalVcs};

pub(crate) struct Fixture {
    pub journal: Journal,
    pub vcs: Arc<JournalVcs>,
    pub tracker: Arc<JournalTracker>,
    pub docs: Arc<FilesystemDocs>,
    pub store: Arc<InMemoryStore>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(|vcs| vcs, |tracker| tracker)
    }

    pub fn with_vcs(vcs: impl FnOnce(JournalVcs) -> JournalVcs) -> Self {
        Self::build(vcs, |tracker| tracker)
    }

    pub fn with_tracker_failure(operation: &str) -> Self {
        Self::build(|vcs| vcs, |tracker| tracker.fail_on(operation, "503 Service Unavailable"))
    }

    fn build(
        vcs: impl FnOnce(JournalVcs) -> JournalVcs,
        tracker: impl FnOnce(JournalTracker) -> JournalTracker,
    ) -> Self {
        let journal = Journal::new();
        Self {
            vcs: Arc::new(vcs(JournalVcs::new(journal.clone()))),
            tracker: Arc::new(tracker(JournalTracker::new(journal.clone()))),
            docs: Arc::new(FilesystemDocs::builtin()),
            store: Arc::new(InMemoryStore::new()),
            journal,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::new(self.vcs.clone(), self.tracker.clone(), self.docs.clone())
    }
}

/// A gateway with one backend, `scripted`, replaying `replies` in order.
pub(crate) fn scripted_gateway(replies: &[&str]) -> (Arc<ReasoningGateway>, Arc<ScriptedProvider>) {
    let provider = Arc::new(ScriptedProvider::new(
        "scripted",
        replies
            .iter()
            .map(|r| Ok(ticketsmith_core::Message::assistant(*r)))
            .collect(),
    ));
    let gateway = ReasoningGateway::new(GatewaySettings::default()).with_backend(provider.clone());
    (Arc::new(gateway), provider)
}

pub(crate) fn models() -> RankedModels {
    RankedModels::new(["scripted:test-model"])
}

pub(crate) fn plan_json() -> String {
    serde_json::json!({
        "commit_message": "feat: scaffold billing service",
        "files": [
            {"path": "Cargo.toml", "content": "[package]\nname = \"billing\""},
            {"path": "src/main.rs", "content": "fn main() {}"}
        ]
    })
    .to_string()
}

pub(crate) fn scaffold_mission() -> Mission {
    serde_json::from_value(serde_json::json!({
        "id": "10001",
        "key": "PROJ-1",
        "summary": "Create billing service",
        "status": "To Do",
        "project_key": "PROJ",
        "issue_type": "Task",
        "description": {
            "raw_content": "Create a billing service that exposes an invoices API.",
            "config": {
                "target": {"gitlab_project_id": "42"},
                "parameters": {"service_name": "billing", "language": "rust"}
            }
        }
    }))
    .unwrap()
}

pub(crate) fn review_mission() -> Mission {
    serde_json::from_value(serde_json::json!({
        "id": "10002",
        "key": "PROJ-2",
        "summary": "Review billing service",
        "status": "In Review",
        "project_key": "PROJ",
        "issue_type": "Task",
        "description": {
            "raw_content": "Please review the billing scaffold.",
            "config": {
                "parameters": {"service_name": "billing"},
                "code_review_params": {
                    "review_request_url": "https://gitlab.local/group/project/-/merge_requests/1",
                    "gitlab_project_id": "42",
                    "source_branch_name": "feature/proj-1-billing"
                }
            }
        }
    }))
    .unwrap()
}

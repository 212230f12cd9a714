//! Shared test fixtures for the loop and the facade.

use std::sync::Arc;

use ticketsmith_core::{AgentRole, Capabilities, Mission, RankedModels};
use ticketsmith_providers::{GatewaySettings, ReasoningGateway, ScriptedCall, ScriptedProvider, ScriptedReply};
use ticketsmith_security::ToolSafetyPolicy;
use ticketsmith_store::InMemoryStore;
use ticketsmith_tools::{FilesystemDocs, Journal, JournalTracker, JournalVcs, ToolRouter};

pub(crate) struct Fixture {
    pub journal: Journal,
    pub vcs: Arc<JournalVcs>,
    pub tracker: Arc<JournalTracker>,
    pub store: Arc<InMemoryStore>,
}

impl Fixture {
    pub fn new() -> Self {
        let journal = Journal::new();
        Self {
            vcs: Arc::new(JournalVcs::new(journal.clone())),
            tracker: Arc::new(JournalTracker::new(journal.clone())),
            store: Arc::new(InMemoryStore::new()),
            journal,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::new(self.vcs.clone(), self.tracker.clone(), Arc::new(FilesystemDocs::builtin()))
    }
}

/// Capabilities around `vcs`, with a tracker on the same journal.
pub(crate) fn capabilities(vcs: JournalVcs) -> Capabilities {
    let journal = vcs.journal().clone();
    Capabilities::new(
        Arc::new(vcs),
        Arc::new(JournalTracker::new(journal)),
        Arc::new(FilesystemDocs::builtin()),
    )
}

pub(crate) async fn router_for(capabilities: &Capabilities, role: AgentRole) -> ToolRouter {
    ToolRouter::build(capabilities, &ToolSafetyPolicy::for_role(role))
        .await
        .unwrap()
}

pub(crate) fn scripted(replies: Vec<ScriptedReply>) -> (Arc<ReasoningGateway>, Arc<ScriptedProvider>, RankedModels) {
    let provider = Arc::new(ScriptedProvider::from_replies("scripted", replies));
    let gateway = ReasoningGateway::new(GatewaySettings::default()).with_backend(provider.clone());
    (Arc::new(gateway), provider, RankedModels::new(["scripted:test-model"]))
}

pub(crate) fn call(id: &str, name: &str, arguments: serde_json::Value) -> ScriptedCall {
    ScriptedCall {
        id: Some(id.into()),
        name: name.into(),
        arguments,
    }
}

pub(crate) fn mission() -> Mission {
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
                "parameters": {"service_name": "billing"}
            }
        }
    }))
    .unwrap()
}

//! Tool router: the name→capability table the ReAct loop works from.
//!
//! Built once per run, before the first turn. Every capability is asked for
//! its tool schemas; the union is filtered through the safety policy and
//! only the surviving tools are exposed to the model or executable.

use std::collections::HashMap;
use std::sync::Arc;

use ticketsmith_core::{Capabilities, CapabilityRole, ProviderFailure, ToolCall, ToolDefinition, ToolSurface};
use ticketsmith_security::{redact, ToolSafetyPolicy};
use tracing::{debug, warn};

struct Route {
    role: CapabilityRole,
    surface: Arc<dyn ToolSurface>,
}

pub struct ToolRouter {
    routes: HashMap<String, Route>,
    /// Exposed definitions, in capability order
    definitions: Vec<ToolDefinition>,
    /// Tools that were offered but removed by the policy, with the reason
    blocked: HashMap<String, String>,
}

impl ToolRouter {
    /// Ask every capability for its tools and keep the ones `policy` allows.
    /// When two capabilities offer the same name, the first one keeps it.
    pub async fn build(capabilities: &Capabilities, policy: &ToolSafetyPolicy) -> Result<Self, ProviderFailure> {
        let mut router = Self {
            routes: HashMap::new(),
            definitions: Vec::new(),
            blocked: HashMap::new(),
        };

        for capability in capabilities.all() {
            let role = capability.role();
            let surface = capability.surface();
            let (allowed, denied) = policy.partition(role, surface.list_tools().await?);
            router.blocked.extend(denied);
            for definition in allowed {
                if router.routes.contains_key(&definition.name) {
                    warn!(tool = %definition.name, capability = %role, "Duplicate tool name ignored");
                    continue;
                }
                router.routes.insert(
                    definition.name.clone(),
                    Route {
                        role,
                        surface: surface.clone(),
                    },
                );
                router.definitions.push(definition);
            }
        }

        debug!(
            exposed = router.definitions.len(),
            blocked = router.blocked.len(),
            "Tool routing table built"
        );
        Ok(router)
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn names(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.name.as_str()).collect()
    }

    /// Run one tool call and return the observation text. This never fails:
    /// unknown, blocked and failing tools all become an `Error: ...`
    /// observation.
    pub async fn execute(&self, call: &ToolCall) -> String {
        if let Some(reason) = self.blocked.get(&call.name) {
            warn!(tool = %call.name, "Model requested a blocked tool");
            return format!("Error: tool '{}' is blocked by safety policy ({reason})", call.name);
        }
        let Some(route) = self.routes.get(&call.name) else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return format!("Error: unknown tool '{}'", call.name);
        };

        debug!(tool = %call.name, capability = %route.role, call_id = %call.id, "Executing tool");
        match route.surface.execute_tool(&call.name, call.arguments.clone()).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                redact(&format!("Error: tool '{}' failed: {e}", call.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::FilesystemDocs;
    use crate::journal::{Journal, JournalTracker, JournalVcs};
    use serde_json::json;
    use ticketsmith_core::AgentRole;

    fn capabilities(vcs: JournalVcs) -> Capabilities {
        let journal = vcs.journal().clone();
        Capabilities::new(
            Arc::new(vcs),
            Arc::new(JournalTracker::new(journal)),
            Arc::new(FilesystemDocs::builtin()),
        )
    }

    fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments,
        }
    }

    #[tokio::test]
    async fn orchestrator_table_hides_destructive_tools() {
        let caps = capabilities(JournalVcs::new(Journal::new()));
        let router = ToolRouter::build(&caps, &ToolSafetyPolicy::for_role(AgentRole::Orchestrator))
            .await
            .unwrap();

        let names = router.names();
        assert!(names.contains(&"create_branch"));
        assert!(names.contains(&"add_comment"));
        assert!(names.contains(&"get_architecture_context"));
        assert!(!names.contains(&"delete_branch"));
        assert!(!names.contains(&"merge_merge_request"));
        assert!(router.blocked["delete_branch"].contains("delete_branch"));
        assert_eq!(router.routes["add_comment"].role, CapabilityRole::Tracker);
    }

    #[tokio::test]
    async fn reviewer_cannot_execute_write_tools() {
        let journal = Journal::new();
        let caps = capabilities(JournalVcs::new(journal.clone()));
        let router = ToolRouter::build(&caps, &ToolSafetyPolicy::for_role(AgentRole::Reviewer))
            .await
            .unwrap();

        let out = router
            .execute(&call("create_branch", json!({"branch_name": "x", "ref": "main"})))
            .await;
        assert!(out.starts_with("Error: tool 'create_branch' is blocked"));
        assert!(out.contains("matches blocked pattern 'create_branch'"));
        assert_eq!(journal.count("create_branch"), 0);
    }

    #[tokio::test]
    async fn failures_become_observations() {
        let caps = capabilities(JournalVcs::new(Journal::new()));
        let router = ToolRouter::build(&caps, &ToolSafetyPolicy::for_role(AgentRole::Orchestrator))
            .await
            .unwrap();

        assert_eq!(
            router.execute(&call("launch_rockets", json!({}))).await,
            "Error: unknown tool 'launch_rockets'"
        );
        let out = router.execute(&call("create_branch", json!({}))).await;
        assert!(out.starts_with("Error: tool 'create_branch' failed"));
        assert!(out.contains("branch_name"));
    }

    #[tokio::test]
    async fn successful_call_returns_tool_output() {
        let caps = capabilities(JournalVcs::new(Journal::new()).with_branch("feature/x"));
        let router = ToolRouter::build(&caps, &ToolSafetyPolicy::for_role(AgentRole::Orchestrator))
            .await
            .unwrap();
        let out = router
            .execute(&call("validate_branch_existence", json!({"branch_name": "feature/x"})))
            .await;
        assert!(out.contains("\"exists\":true"));
    }
}

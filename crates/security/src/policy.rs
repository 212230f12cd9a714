//! Tool-safety policy: decides which tools an agent may see and call.
//!
//! A tool is blocked when its name contains any blocklisted substring
//! (case-insensitive), or when it belongs to a capability role the agent is
//! not allowed to touch. The universal blocklist applies to every agent.

use ticketsmith_config::SafetyConfig;
use ticketsmith_core::{AgentRole, CapabilityRole, ToolDefinition};
use tracing::warn;

/// Result of checking a tool against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyVerdict {
    Allowed,
    Denied { tool: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct ToolSafetyPolicy {
    role: AgentRole,
    /// Lower-cased substrings, universal entries first
    blocked_fragments: Vec<String>,
    blocked_roles: Vec<CapabilityRole>,
}

impl ToolSafetyPolicy {
    pub fn new(
        role: AgentRole,
        fragments: impl IntoIterator<Item = String>,
        blocked_roles: impl IntoIterator<Item = CapabilityRole>,
    ) -> Self {
        let mut blocked_fragments: Vec<String> = Vec::new();
        for f in fragments {
            let f = f.trim().to_ascii_lowercase();
            if !f.is_empty() && !blocked_fragments.contains(&f) {
                blocked_fragments.push(f);
            }
        }
        Self {
            role,
            blocked_fragments,
            blocked_roles: blocked_roles.into_iter().collect(),
        }
    }

    /// Build the policy for `role` from configuration.
    pub fn from_config(config: &SafetyConfig, role: AgentRole) -> Self {
        let fragments = config
            .universal_blocklist
            .iter()
            .chain(config.blocklist_for(role))
            .cloned();
        Self::new(role, fragments, config.blocked_roles_for(role).iter().copied())
    }

    /// A policy with only the built-in defaults for `role`.
    pub fn for_role(role: AgentRole) -> Self {
        Self::from_config(&SafetyConfig::default(), role)
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn check(&self, tool_name: &str, capability: CapabilityRole) -> SafetyVerdict {
        if self.blocked_roles.contains(&capability) {
            return SafetyVerdict::Denied {
                tool: tool_name.to_string(),
                reason: format!("{} tools are not available to the {}", capability, self.role),
            };
        }

        let lowered = tool_name.to_ascii_lowercase();
        match self.blocked_fragments.iter().find(|f| lowered.contains(f.as_str())) {
            Some(fragment) => SafetyVerdict::Denied {
                tool: tool_name.to_string(),
                reason: format!("matches blocked pattern '{fragment}'"),
            },
            None => SafetyVerdict::Allowed,
        }
    }

    /// Split offered definitions into the allowed ones and the denied
    /// `(tool, reason)` pairs, logging each denial.
    pub fn partition(
        &self,
        capability: CapabilityRole,
        tools: Vec<ToolDefinition>,
    ) -> (Vec<ToolDefinition>, Vec<(String, String)>) {
        let mut allowed = Vec::with_capacity(tools.len());
        let mut denied = Vec::new();
        for definition in tools {
            match self.check(&definition.name, capability) {
                SafetyVerdict::Allowed => allowed.push(definition),
                SafetyVerdict::Denied { tool, reason } => {
                    warn!(role = %self.role, tool = %tool, reason = %reason, "Tool blocked by safety policy");
                    denied.push((tool, reason));
                }
            }
        }
        (allowed, denied)
    }
}

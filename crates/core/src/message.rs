//! Conversation messages exchanged with model backends.
//!
//! The ReAct loop builds a `Vec<Message>` turn by turn: system + user first,
//! then alternating assistant (with tool calls) and tool observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,

    pub role: Role,

    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// An assistant turn that requested tools, echoed back so the model sees
    /// its own calls next to the observations.
    pub fn assistant_with_calls(content: impl Into<String>, calls: &[ToolCall]) -> Self {
        let mut msg = Self::with_role(Role::Assistant, content);
        msg.tool_calls = calls.iter().map(MessageToolCall::from).collect();
        msg
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }
}

/// A tool call as it travels on the wire: arguments are a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl MessageToolCall {
    /// Decode the argument string. An empty string means "no arguments".
    pub fn parse(&self) -> Result<ToolCall, serde_json::Error> {
        let arguments = if self.arguments.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&self.arguments)?
        };
        Ok(ToolCall {
            id: self.id.clone(),
            name: self.name.clone(),
            arguments,
        })
    }
}

impl From<&ToolCall> for MessageToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.to_string(),
        }
    }
}

/// A decoded request to execute a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id (matches the model's tool_call.id)
    pub id: String,

    pub name: String,

    /// Opaque argument payload
    pub arguments: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_carries_correlation_id() {
        let msg = Message::tool_result("call_7", "ok");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_7"));
    }

    #[test]
    fn wire_call_parses_arguments() {
        let wire = MessageToolCall {
            id: "c1".into(),
            name: "create_branch".into(),
            arguments: r#"{"branch_name":"feature/x"}"#.into(),
        };
        let call = wire.parse().unwrap();
        assert_eq!(call.arguments["branch_name"], "feature/x");
    }

    #[test]
    fn empty_argument_string_is_empty_object() {
        let wire = MessageToolCall {
            id: "c1".into(),
            name: "list".into(),
            arguments: "  ".into(),
        };
        assert!(wire.parse().unwrap().arguments.as_object().unwrap().is_empty());
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        let wire = MessageToolCall {
            id: "c1".into(),
            name: "list".into(),
            arguments: "{not json".into(),
        };
        assert!(wire.parse().is_err());
    }

    #[test]
    fn assistant_echo_keeps_calls() {
        let call = ToolCall {
            id: "c9".into(),
            name: "add_comment".into(),
            arguments: serde_json::json!({"text": "hi"}),
        };
        let msg = Message::assistant_with_calls("thinking", std::slice::from_ref(&call));
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].parse().unwrap(), call);
    }
}

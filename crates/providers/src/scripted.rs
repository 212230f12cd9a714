//! Scripted backend: replays a fixed list of replies.
//!
//! Used for offline runs (`ticketsmith run --replay replies.json`) and by
//! tests across the workspace. Replies are served in order; once only one is
//! left it is repeated for every further request.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Deserialize;
use ticketsmith_core::message::{Message, MessageToolCall};
use ticketsmith_core::provider::{Provider, ProviderRequest, ProviderResponse};
use ticketsmith_core::ProviderFailure;

/// One reply in a replay file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptedReply {
    Failure {
        error: String,
    },
    Message {
        #[serde(default)]
        content: String,
        #[serde(default)]
        tool_calls: Vec<ScriptedCall>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ScriptedProvider {
    name: String,
    replies: Mutex<VecDeque<Result<Message, ProviderFailure>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(name: impl Into<String>, replies: Vec<Result<Message, ProviderFailure>>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `content`.
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name, vec![Ok(Message::assistant(content))])
    }

    /// Always fails with a transient failure.
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let failure = ProviderFailure::transient(name.clone(), message);
        Self::new(name, vec![Err(failure)])
    }

    pub fn from_replies(name: impl Into<String>, replies: Vec<ScriptedReply>) -> Self {
        let name = name.into();
        let replies = replies
            .into_iter()
            .enumerate()
            .map(|(i, reply)| match reply {
                ScriptedReply::Failure { error } => Err(ProviderFailure::transient(name.clone(), error)),
                ScriptedReply::Message { content, tool_calls } => {
                    let mut message = Message::assistant(content);
                    message.tool_calls = tool_calls
                        .into_iter()
                        .enumerate()
                        .map(|(j, call)| MessageToolCall {
                            id: call.id.unwrap_or_else(|| format!("call_{i}_{j}")),
                            name: call.name,
                            arguments: match call.arguments {
                                serde_json::Value::Null => String::new(),
                                other => other.to_string(),
                            },
                        })
                        .collect();
                    Ok(message)
                }
            })
            .collect();
        Self::new(name, replies)
    }

    /// Load a JSON array of [`ScriptedReply`] values.
    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self, ProviderFailure> {
        let name = name.into();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderFailure::permanent(name.clone(), format!("cannot read {}: {e}", path.display()))
        })?;
        let replies: Vec<ScriptedReply> = serde_json::from_str(&content).map_err(|e| {
            ProviderFailure::permanent(name.clone(), format!("invalid replay file {}: {e}", path.display()))
        })?;
        if replies.is_empty() {
            return Err(ProviderFailure::permanent(
                name,
                format!("replay file {} has no replies", path.display()),
            ));
        }
        Ok(Self::from_replies(name, replies))
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        lock(&self.requests).last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderFailure> {
        let model = request.model.clone();
        lock(&self.requests).push(request);
        let reply = {
            let mut replies = lock(&self.replies);
            if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            }
        };
        let message = reply.unwrap_or_else(|| {
            Err(ProviderFailure::permanent(self.name.clone(), "no scripted replies"))
        })?;
        Ok(ProviderResponse {
            message,
            usage: None,
            model,
        })
    }
}

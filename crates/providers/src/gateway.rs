//! Reasoning gateway: ranked-model fallback with per-candidate timeouts.
//!
//! Every call walks the ranked candidate list in order. A candidate that
//! errors, times out, returns nothing, or returns output that does not
//! parse is logged and skipped. When every candidate has failed the caller
//! gets one `ReasoningError::Exhausted` carrying the last failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ticketsmith_config::ReasoningConfig;
use ticketsmith_core::message::Message;
use ticketsmith_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
use ticketsmith_core::{
    CandidateFailure, ModelId, Prompt, RankedModels, ReasoningError, StructuredOutput, ToolCall,
    ToolTurn,
};
use ticketsmith_security::redact;
use tracing::{debug, info, warn};

use crate::structured::parse_structured;

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub candidate_timeout: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from(&ReasoningConfig::default())
    }
}

impl From<&ReasoningConfig> for GatewaySettings {
    fn from(config: &ReasoningConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            candidate_timeout: Duration::from_secs(config.candidate_timeout_secs),
        }
    }
}

/// A registered backend and the timeout applied to each call on it.
struct BackendEntry {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

pub struct ReasoningGateway {
    backends: HashMap<String, BackendEntry>,
    settings: GatewaySettings,
}

impl ReasoningGateway {
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            backends: HashMap::new(),
            settings,
        }
    }

    /// Register a backend under its `Provider::name()` with the default
    /// candidate timeout.
    pub fn with_backend(self, provider: Arc<dyn Provider>) -> Self {
        let timeout = self.settings.candidate_timeout;
        self.with_backend_timeout(provider, timeout)
    }

    /// Register a backend with its own timeout. A later registration under
    /// the same name replaces the earlier one.
    pub fn with_backend_timeout(mut self, provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        self.backends
            .insert(provider.name().to_string(), BackendEntry { provider, timeout });
        self
    }

    pub fn backend_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Ask for a value of type `T`. The JSON schema of `T` is appended to the
    /// system prompt and the backend is asked for JSON output.
    pub async fn generate_structured<T: StructuredOutput>(
        &self,
        prompt: &Prompt,
        ranked: &RankedModels,
    ) -> Result<T, ReasoningError> {
        let messages = structured_messages::<T>(prompt);
        let mut attempts = 0;
        let mut last: Option<CandidateFailure> = None;

        for raw_id in ranked.iter() {
            attempts += 1;
            let outcome = match self.call_candidate(raw_id, &messages, &[], true, attempts, ranked.len()).await {
                Ok(response) => parse_structured::<T>(raw_id, &response.message.content),
                Err(failure) => Err(failure),
            };
            match outcome {
                Ok(value) => {
                    info!(model = %raw_id, attempt = attempts, "Structured generation succeeded");
                    return Ok(value);
                }
                Err(failure) => {
                    warn!(model = %raw_id, error = %failure, "Candidate failed, trying next");
                    last = Some(failure);
                }
            }
        }

        Err(exhausted(attempts, last))
    }

    /// One tool-calling turn. Returns the assistant content plus any tool
    /// calls with their arguments already parsed.
    pub async fn generate_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        ranked: &RankedModels,
    ) -> Result<ToolTurn, ReasoningError> {
        let mut attempts = 0;
        let mut last: Option<CandidateFailure> = None;

        for raw_id in ranked.iter() {
            attempts += 1;
            let outcome = match self.call_candidate(raw_id, messages, tools, false, attempts, ranked.len()).await {
                Ok(response) => tool_turn(raw_id, response),
                Err(failure) => Err(failure),
            };
            match outcome {
                Ok(turn) => {
                    info!(
                        model = %raw_id,
                        attempt = attempts,
                        tool_calls = turn.tool_calls.len(),
                        "Tool turn succeeded"
                    );
                    return Ok(turn);
                }
                Err(failure) => {
                    warn!(model = %raw_id, error = %failure, "Candidate failed, trying next");
                    last = Some(failure);
                }
            }
        }

        Err(exhausted(attempts, last))
    }

    async fn call_candidate(
        &self,
        raw_id: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        json_mode: bool,
        attempt: usize,
        total: usize,
    ) -> Result<ProviderResponse, CandidateFailure> {
        let id = ModelId::parse(raw_id)?;
        let entry = self
            .backends
            .get(&id.provider)
            .ok_or_else(|| CandidateFailure::UnknownBackend {
                model: raw_id.to_string(),
                provider: id.provider.clone(),
            })?;

        info!(model = %raw_id, attempt, total, "Trying model candidate");
        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload = serde_json::to_string(messages).unwrap_or_default();
            debug!(model = %raw_id, prompt = %redact(&payload), "Sending prompt");
        }

        let request = ProviderRequest {
            model: id.model.clone(),
            messages: messages.to_vec(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            tools: tools.to_vec(),
            json_mode,
        };

        match tokio::time::timeout(entry.timeout, entry.provider.complete(request)).await {
            Ok(Ok(response)) => {
                if let Some(usage) = &response.usage {
                    debug!(
                        model = %raw_id,
                        tokens_in = usage.prompt_tokens,
                        tokens_out = usage.completion_tokens,
                        "Candidate usage"
                    );
                }
                Ok(response)
            }
            Ok(Err(failure)) => Err(CandidateFailure::Provider {
                model: raw_id.to_string(),
                failure,
            }),
            Err(_) => Err(CandidateFailure::Timeout {
                model: raw_id.to_string(),
                timeout_secs: entry.timeout.as_secs(),
            }),
        }
    }
}

fn structured_messages<T: StructuredOutput>(prompt: &Prompt) -> Vec<Message> {
    let schema = serde_json::to_string_pretty(&T::schema()).unwrap_or_default();
    let instructions = format!(
        "Respond with a single JSON object that validates against this JSON schema. \
         Return only the JSON.\n\n{schema}"
    );
    let system = match &prompt.system {
        Some(s) if !s.trim().is_empty() => format!("{s}\n\n{instructions}"),
        _ => instructions,
    };
    vec![Message::system(system), Message::user(prompt.user.clone())]
}

fn tool_turn(model: &str, response: ProviderResponse) -> Result<ToolTurn, CandidateFailure> {
    let message = response.message;
    let tool_calls = message
        .tool_calls
        .iter()
        .map(|tc| {
            tc.parse().map_err(|e| CandidateFailure::MalformedJson {
                model: model.to_string(),
                reason: format!("arguments of tool call '{}': {e}", tc.name),
            })
        })
        .collect::<Result<Vec<ToolCall>, _>>()?;

    if message.content.trim().is_empty() && tool_calls.is_empty() {
        return Err(CandidateFailure::EmptyContent {
            model: model.to_string(),
        });
    }

    Ok(ToolTurn {
        content: message.content,
        tool_calls,
        model: model.to_string(),
    })
}

fn exhausted(attempts: usize, last: Option<CandidateFailure>) -> ReasoningError {
    match last {
        Some(last) => ReasoningError::Exhausted { attempts, last },
        None => ReasoningError::NoCandidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedProvider;
    use async_trait::async_trait;
    use ticketsmith_core::message::MessageToolCall;
    use ticketsmith_core::{ProviderFailure, ScaffoldPlan};

    /// Never answers (for timeout testing).
    struct HangingProvider;

    #[async_trait]
    impl Provider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderFailure> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ProviderFailure::transient("hanging", "unreachable"))
        }
    }

    fn gateway(backends: Vec<Arc<dyn Provider>>) -> ReasoningGateway {
        backends
            .into_iter()
            .fold(ReasoningGateway::new(GatewaySettings::default()), |g, b| g.with_backend(b))
    }

    fn plan_json() -> &'static str {
        r#"{"commit_message":"feat: scaffold","files":[{"path":"README.md","content":"hi"}]}"#
    }

    #[tokio::test]
    async fn first_success_stops_the_walk() {
        let a = Arc::new(ScriptedProvider::text("a", plan_json()));
        let b = Arc::new(ScriptedProvider::text("b", plan_json()));
        let gw = gateway(vec![a.clone(), b.clone()]);

        let plan: ScaffoldPlan = gw
            .generate_structured(&Prompt::user("go"), &RankedModels::new(["a:m1", "b:m2"]))
            .await
            .unwrap();
        assert_eq!(plan.files.len(), 1);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
        assert_eq!(a.last_request().unwrap().model, "m1");
        assert!(a.last_request().unwrap().json_mode);
    }

    #[tokio::test]
    async fn m_minus_one_failures_make_exactly_m_attempts() {
        let a = Arc::new(ScriptedProvider::failing("a", "500"));
        let b = Arc::new(ScriptedProvider::text("b", "not json at all"));
        let c = Arc::new(ScriptedProvider::text("c", plan_json()));
        let gw = gateway(vec![a.clone(), b.clone(), c.clone()]);

        let ranked = RankedModels::new(["a:x", "b:y", "c:z"]);
        let plan: ScaffoldPlan = gw.generate_structured(&Prompt::user("go"), &ranked).await.unwrap();
        assert_eq!(plan.commit_message, "feat: scaffold");
        assert_eq!(a.calls() + b.calls() + c.calls(), 3);
    }

    #[tokio::test]
    async fn exhausted_error_carries_the_last_failure() {
        let a = Arc::new(ScriptedProvider::failing("a", "rate limited"));
        let b = Arc::new(ScriptedProvider::text("b", r#"{"unexpected": true}"#));
        let gw = gateway(vec![a, b]);

        let err = gw
            .generate_structured::<ScaffoldPlan>(&Prompt::user("go"), &RankedModels::new(["a:x", "b:y"]))
            .await
            .unwrap_err();
        match err {
            ReasoningError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert_eq!(last.model(), "b:y");
                assert!(matches!(last, CandidateFailure::SchemaValidation { .. }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fenced_json_is_accepted() {
        let a = Arc::new(ScriptedProvider::text("a", "```json\n{\"a\":1}\n```"));
        let gw = gateway(vec![a]);
        let value: serde_json::Value = gw
            .generate_structured(&Prompt::user("go"), &RankedModels::new(["a:x"]))
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[tokio::test]
    async fn unknown_backend_and_bad_id_advance() {
        let b = Arc::new(ScriptedProvider::text("b", "{}"));
        let gw = gateway(vec![b.clone()]);
        let ranked = RankedModels::new(["ghost:x", "no-separator", "b:y"]);
        let value: serde_json::Value = gw.generate_structured(&Prompt::user("go"), &ranked).await.unwrap();
        assert_eq!(value, serde_json::json!({}));
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn empty_ranking_is_no_candidates() {
        let gw = gateway(vec![]);
        let err = gw
            .generate_structured::<serde_json::Value>(&Prompt::user("go"), &RankedModels::new(Vec::<String>::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, ReasoningError::NoCandidates));
    }

    #[tokio::test]
    async fn timeout_is_a_candidate_failure() {
        let fast = Arc::new(ScriptedProvider::text("fast", "{}"));
        let gw = ReasoningGateway::new(GatewaySettings::default())
            .with_backend_timeout(Arc::new(HangingProvider), Duration::from_millis(50))
            .with_backend(fast.clone());

        let value: serde_json::Value = gw
            .generate_structured(&Prompt::user("go"), &RankedModels::new(["hanging:x", "fast:y"]))
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({}));
        assert_eq!(fast.calls(), 1);
    }

    #[tokio::test]
    async fn hints_are_tried_before_priority_list() {
        let a = Arc::new(ScriptedProvider::failing("a", "down"));
        let b = Arc::new(ScriptedProvider::failing("b", "down"));
        let gw = gateway(vec![a.clone(), b.clone()]);

        let ranked = RankedModels::new(["a:x"]).with_hints(["b:hint"]);
        let err = gw
            .generate_structured::<serde_json::Value>(&Prompt::user("go"), &ranked)
            .await
            .unwrap_err();
        match err {
            ReasoningError::Exhausted { last, .. } => assert_eq!(last.model(), "a:x"),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(b.last_request().unwrap().model, "hint");
    }

    #[tokio::test]
    async fn schema_lands_in_system_prompt() {
        let a = Arc::new(ScriptedProvider::text("a", plan_json()));
        let gw = gateway(vec![a.clone()]);
        let _: ScaffoldPlan = gw
            .generate_structured(&Prompt::user("go").with_system("You scaffold."), &RankedModels::new(["a:x"]))
            .await
            .unwrap();

        let system = &a.last_request().unwrap().messages[0];
        assert!(system.content.starts_with("You scaffold."));
        assert!(system.content.contains("commit_message"));
    }

    #[tokio::test]
    async fn tool_turn_parses_arguments() {
        let mut reply = Message::assistant("");
        reply.tool_calls = vec![MessageToolCall {
            id: "call_1".into(),
            name: "create_branch".into(),
            arguments: r#"{"branch_name":"feature/x"}"#.into(),
        }];
        let a = Arc::new(ScriptedProvider::new("a", vec![Ok(reply)]));
        let gw = gateway(vec![a]);

        let turn = gw
            .generate_with_tools(&[Message::user("go")], &[], &RankedModels::new(["a:x"]))
            .await
            .unwrap();
        assert!(!turn.is_final());
        assert_eq!(turn.tool_calls[0].arguments["branch_name"], "feature/x");
        assert_eq!(turn.model, "a:x");
    }

    #[tokio::test]
    async fn bad_tool_arguments_advance_to_next_candidate() {
        let mut broken = Message::assistant("");
        broken.tool_calls = vec![MessageToolCall {
            id: "call_1".into(),
            name: "create_branch".into(),
            arguments: "{oops".into(),
        }];
        let a = Arc::new(ScriptedProvider::new("a", vec![Ok(broken)]));
        let b = Arc::new(ScriptedProvider::text("b", "all done"));
        let gw = gateway(vec![a, b.clone()]);

        let turn = gw
            .generate_with_tools(&[Message::user("go")], &[], &RankedModels::new(["a:x", "b:y"]))
            .await
            .unwrap();
        assert!(turn.is_final());
        assert_eq!(turn.content, "all done");
        assert_eq!(b.calls(), 1);
    }
}

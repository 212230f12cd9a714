//! ReAct loop: Thought → Action → Observation, bounded by an iteration cap.
//!
//! Each iteration is one `generate_with_tools` call. A reply without tool
//! calls ends the loop with its content. Otherwise every requested call is
//! executed through the [`ToolRouter`] and one observation per call is
//! appended, tagged with the call's correlation id, before the next turn.
//!
//! Tool failures never end the loop; they come back as `Error: ...`
//! observations. Only the cap or an exhausted gateway does.

use std::sync::Arc;

use futures::future::join_all;
use ticketsmith_core::message::Message;
use ticketsmith_core::{Mission, RankedModels, ReasoningError, ToolCall};
use ticketsmith_providers::ReasoningGateway;
use ticketsmith_tools::ToolRouter;
use tracing::{debug, info, warn};

/// One think-act-observe iteration.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    pub iteration: usize,
    /// Model content for the turn
    pub thought: String,
    pub actions: Vec<ToolCall>,
    /// One per action, same order
    pub observations: Vec<String>,
    /// Candidate that answered
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ReactResult {
    pub answer: String,
    pub trace: Vec<TraceEntry>,
    pub iterations: usize,
    pub tool_calls_made: usize,
    /// True when the loop stopped at the cap instead of a final answer
    pub hit_cap: bool,
}

pub struct ReactLoop {
    gateway: Arc<ReasoningGateway>,
    max_iterations: u32,
}

impl ReactLoop {
    pub fn new(gateway: Arc<ReasoningGateway>) -> Self {
        Self {
            gateway,
            max_iterations: 5,
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub async fn run_loop(
        &self,
        mission: &Mission,
        system_prompt: &str,
        router: &ToolRouter,
        ranked: &RankedModels,
    ) -> Result<ReactResult, ReasoningError> {
        let mut messages = vec![Message::system(system_prompt), Message::user(mission_brief(mission))];
        let mut trace = Vec::new();
        let mut tool_calls_made = 0;
        let mut last_content = String::new();

        info!(
            mission = %mission.key,
            max_iterations = self.max_iterations,
            tools = router.definitions().len(),
            "Starting ReAct loop"
        );

        for iteration in 1..=self.max_iterations as usize {
            let turn = self
                .gateway
                .generate_with_tools(&messages, router.definitions(), ranked)
                .await?;

            if turn.is_final() {
                info!(mission = %mission.key, iteration, tool_calls_made, "ReAct loop finished");
                trace.push(TraceEntry {
                    iteration,
                    thought: turn.content.clone(),
                    actions: Vec::new(),
                    observations: Vec::new(),
                    model: turn.model,
                });
                return Ok(ReactResult {
                    answer: turn.content,
                    trace,
                    iterations: iteration,
                    tool_calls_made,
                    hit_cap: false,
                });
            }

            debug!(iteration, calls = turn.tool_calls.len(), "Executing tool calls");
            messages.push(Message::assistant_with_calls(turn.content.clone(), &turn.tool_calls));

            let observations = join_all(turn.tool_calls.iter().map(|call| router.execute(call))).await;
            for (call, observation) in turn.tool_calls.iter().zip(&observations) {
                messages.push(Message::tool_result(call.id.clone(), observation.clone()));
            }

            tool_calls_made += turn.tool_calls.len();
            last_content = turn.content.clone();
            trace.push(TraceEntry {
                iteration,
                thought: turn.content,
                actions: turn.tool_calls,
                observations,
                model: turn.model,
            });
        }

        warn!(
            mission = %mission.key,
            max_iterations = self.max_iterations,
            tool_calls_made,
            "ReAct loop reached the iteration cap"
        );
        Ok(ReactResult {
            answer: last_content,
            iterations: trace.len(),
            trace,
            tool_calls_made,
            hit_cap: true,
        })
    }
}

/// The first user message: the ticket, wrapped in tags.
fn mission_brief(mission: &Mission) -> String {
    let config = serde_json::to_string_pretty(&mission.description.config).unwrap_or_default();
    format!(
        "<mission key=\"{key}\" type=\"{kind}\" status=\"{status}\">\n\
         <summary>{summary}</summary>\n\
         <description>\n{raw}\n</description>\n\
         <config>\n{config}\n</config>\n\
         </mission>",
        key = mission.key,
        kind = mission.issue_type,
        status = mission.status,
        summary = mission.summary,
        raw = mission.description.raw_content.trim(),
    )
}

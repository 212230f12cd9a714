//! Prompt builders for the two deterministic workflows.
//!
//! Ticket text and repository content are wrapped in tags so the model can
//! tell instructions from data.

use ticketsmith_core::delivery::render_diff;
use ticketsmith_core::{CodeReviewParams, FileChange, FileContent, Mission, Prompt};

const SCAFFOLD_SYSTEM: &str = "\
You are a senior software engineer who bootstraps new services. \
Produce the initial file set for the service described in the ticket, \
following the architecture guidance you are given. \
Return every file with its full content and a conventional-commit message. \
Do not invent requirements the ticket does not state.";

const REVIEW_SYSTEM: &str = "\
You are a meticulous code reviewer. \
Review only the changes in the diff, using the original code and the project \
conventions as context. \
Classify each finding as CRITICAL, WARNING or SUGGESTION. \
Never approve a change that has a CRITICAL finding.";

pub fn scaffold_prompt(mission: &Mission, architecture: &str) -> Prompt {
    let config = &mission.description.config;
    let parameters = serde_json::to_string_pretty(&config.parameters).unwrap_or_default();
    let user = format!(
        "<ticket key=\"{key}\">\n<summary>{summary}</summary>\n<description>\n{raw}\n</description>\n</ticket>\n\n\
         <service name=\"{service}\">\n{parameters}\n</service>\n\n\
         <architecture>\n{architecture}\n</architecture>\n\n\
         Generate the scaffold for this service.",
        key = mission.key,
        summary = mission.summary,
        raw = mission.description.raw_content.trim(),
        service = mission.service_name(),
    );
    Prompt::user(user).with_system(SCAFFOLD_SYSTEM)
}

pub fn review_prompt(
    mission: &Mission,
    params: &CodeReviewParams,
    tree: &str,
    original: &[FileContent],
    diff: &[FileChange],
    conventions: &str,
) -> Prompt {
    let mut code = String::new();
    for file in original {
        code.push_str(&format!("<file path=\"{}\">\n{}\n</file>\n", file.path, file.content));
    }
    let user = format!(
        "<ticket key=\"{key}\">\n{summary}\n</ticket>\n\n\
         <merge_request url=\"{url}\" source_branch=\"{branch}\"/>\n\n\
         <conventions>\n{conventions}\n</conventions>\n\n\
         <repository_tree>\n{tree}\n</repository_tree>\n\n\
         <original_code>\n{code}</original_code>\n\n\
         <diff>\n{diff}</diff>\n\n\
         Review the diff.",
        key = mission.key,
        summary = mission.summary,
        url = params.review_request_url,
        branch = params.source_branch_name,
        diff = render_diff(diff),
    );
    Prompt::user(user).with_system(REVIEW_SYSTEM)
}

//! Turning raw model text into a validated typed value.

use ticketsmith_core::{CandidateFailure, StructuredOutput};

const FENCE: &str = "```";

/// Remove a surrounding markdown code fence (with or without a language
/// tag). Text that already starts as a JSON object or array is returned
/// trimmed, whatever it contains. Otherwise prose before the opening fence
/// is dropped, and the body ends at the last fence line after it.
///
/// Fences only count at the start of a line. A JSON string cannot hold a raw
/// newline, so a ``` inside a string value is never taken for a fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }
    let Some(open) = fence_lines(trimmed).next() else {
        return trimmed;
    };

    let after_open = trimmed[open..].trim_start();
    // Skip the info string (`json`, `JSON`, ...) up to the end of that line.
    let body = match after_open.find('\n') {
        Some(nl) => &after_open[nl + 1..],
        None => {
            let inline = after_open[FENCE.len()..].trim_start_matches(|c: char| c.is_ascii_alphabetic());
            return inline.strip_suffix(FENCE).unwrap_or(inline).trim();
        }
    };

    match fence_lines(body).last() {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Byte offsets of the lines that open with a fence.
fn fence_lines(text: &str) -> impl Iterator<Item = usize> + '_ {
    let mut offset = 0;
    text.split_inclusive('\n').filter_map(move |line| {
        let start = offset;
        offset += line.len();
        line.trim_start().starts_with(FENCE).then_some(start)
    })
}

/// Strip fences, parse JSON, deserialize into `T` and run its own checks.
///
/// JSON syntax errors and shape errors map to different failure kinds so the
/// gateway can log which one a candidate produced.
pub fn parse_structured<T: StructuredOutput>(model: &str, raw: &str) -> Result<T, CandidateFailure> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(CandidateFailure::EmptyContent {
            model: model.to_string(),
        });
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| CandidateFailure::MalformedJson {
            model: model.to_string(),
            reason: e.to_string(),
        })?;

    let typed: T = serde_json::from_value(value).map_err(|e| CandidateFailure::SchemaValidation {
        model: model.to_string(),
        reason: e.to_string(),
    })?;

    typed
        .validate()
        .map_err(|reason| CandidateFailure::SchemaValidation {
            model: model.to_string(),
            reason,
        })?;

    Ok(typed)
}

//! Argument helpers shared by the agentic `execute_tool` implementations.

use serde::de::DeserializeOwned;
use ticketsmith_core::ProviderFailure;

/// Required string argument. Blank strings count as missing.
pub fn required_str<'a>(system: &str, args: &'a serde_json::Value, key: &str) -> Result<&'a str, ProviderFailure> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ProviderFailure::permanent(system, format!("missing required argument '{key}'")))
}

pub fn optional_str<'a>(args: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

/// Required argument that is an id; accepts a JSON string or number.
pub fn required_id(system: &str, args: &serde_json::Value, key: &str) -> Result<String, ProviderFailure> {
    match args.get(key) {
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ProviderFailure::permanent(system, format!("missing required argument '{key}'"))),
    }
}

/// Deserialize one argument into a typed value.
pub fn typed<T: DeserializeOwned>(system: &str, args: &serde_json::Value, key: &str) -> Result<T, ProviderFailure> {
    let raw = args
        .get(key)
        .cloned()
        .ok_or_else(|| ProviderFailure::permanent(system, format!("missing required argument '{key}'")))?;
    serde_json::from_value(raw)
        .map_err(|e| ProviderFailure::permanent(system, format!("invalid argument '{key}': {e}")))
}

pub fn unknown_tool(system: &str, name: &str) -> ProviderFailure {
    ProviderFailure::permanent(system, format!("unknown tool '{name}'"))
}

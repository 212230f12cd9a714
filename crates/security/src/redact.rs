//! Secret redaction for log lines and tracker comments.

use regex_lite::Regex;
use std::sync::LazyLock;

const MASK: &str = "[REDACTED]";

/// Patterns are applied in order; the header rules run before the bare
/// token rules so `Authorization: Bearer x` collapses to one mask.
const PATTERNS: &[(&str, &str)] = &[
    (r"(?i)(authorization\s*[:=]\s*)(?:(?:bearer|basic|token)\s+)?[^\s,;]+", "${1}[REDACTED]"),
    (r"(?i)(private[-_]token\s*[:=]\s*)[^\s,;&]+", "${1}[REDACTED]"),
    (r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]+=*", "Bearer [REDACTED]"),
    (r"(?i)(api[_-]?(?:token|key)\s*[:=]\s*)[^\s,;&]+", "${1}[REDACTED]"),
    (r"\bsk-[A-Za-z0-9_\-]{8,}", MASK),
];

pub struct Redactor {
    rules: Vec<(Regex, &'static str)>,
}

impl Redactor {
    pub fn new() -> Self {
        let rules = PATTERNS
            .iter()
            .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, *replacement)))
            .collect();
        Self { rules }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (re, replacement) in &self.rules {
            if re.is_match(&out) {
                out = re.replace_all(&out, *replacement).into_owned();
            }
        }
        out
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT: LazyLock<Redactor> = LazyLock::new(Redactor::new);

/// Redact with the built-in rules.
pub fn redact(text: &str) -> String {
    DEFAULT.redact(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_rules_compile() {
        assert_eq!(Redactor::new().rules.len(), PATTERNS.len());
    }

    #[test]
    fn bearer_tokens_are_masked() {
        let out = redact("request failed: Bearer abc.def-123 rejected");
        assert_eq!(out, "request failed: Bearer [REDACTED] rejected");
    }

    #[test]
    fn authorization_header_collapses_to_one_mask() {
        let out = redact("Authorization: Bearer abc123");
        assert_eq!(out, "Authorization: [REDACTED]");
    }

    #[test]
    fn private_token_and_query_key_are_masked() {
        let out = redact("PRIVATE-TOKEN: glpat-xyz url=https://h/api?api_token=s3cr3t&page=2");
        assert!(!out.contains("glpat-xyz"));
        assert!(!out.contains("s3cr3t"));
        assert!(out.contains("page=2"));
    }

    #[test]
    fn openai_style_keys_are_masked() {
        assert_eq!(redact("key sk-proj_ABCDEFGH1234 leaked"), "key [REDACTED] leaked");
    }

    #[test]
    fn clean_text_is_untouched() {
        let text = "Branch feature/proj-1-billing already exists";
        assert_eq!(redact(text), text);
    }
}

//! Code review report produced by the analysis step and published to the
//! merge request.

use crate::reasoning::StructuredOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewSeverity {
    #[serde(alias = "critical")]
    Critical,
    #[serde(alias = "warning")]
    Warning,
    #[serde(alias = "suggestion")]
    Suggestion,
}

impl std::fmt::Display for ReviewSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Critical => "CRITICAL",
            Self::Warning => "WARNING",
            Self::Suggestion => "SUGGESTION",
        };
        f.write_str(label)
    }
}

/// One finding, anchored to a file and optionally a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReviewComment {
    /// Path of the analysed file
    pub file_path: String,
    /// Line of the finding, null for file-level remarks
    #[serde(default)]
    pub line_number: Option<u32>,
    pub severity: ReviewSeverity,
    /// Technical explanation of the problem
    pub description: String,
    /// Suggested code or action
    #[serde(default)]
    pub suggestion: String,
}

impl ReviewComment {
    pub fn validate(&self) -> Result<(), String> {
        if self.file_path.trim().is_empty() {
            return Err("review comment has an empty file_path".into());
        }
        if self.description.trim().is_empty() {
            return Err(format!(
                "review comment on '{}' has an empty description",
                self.file_path
            ));
        }
        Ok(())
    }
}

/// The verdict plus findings for one merge request.
///
/// A report carrying any [`ReviewSeverity::Critical`] comment is never
/// approved, whatever the model answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CodeReviewReport {
    /// True if the code is publishable, false if it needs changes
    #[serde(rename = "is_approved")]
    approved_by_model: bool,
    /// Executive summary of the analysis
    summary: String,
    #[serde(default, rename = "issues")]
    comments: Vec<ReviewComment>,
}

impl CodeReviewReport {
    pub fn new(approved: bool, summary: impl Into<String>, comments: Vec<ReviewComment>) -> Self {
        Self {
            approved_by_model: approved,
            summary: summary.into(),
            comments,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.approved_by_model && !self.has_critical()
    }

    pub fn has_critical(&self) -> bool {
        self.count(ReviewSeverity::Critical) > 0
    }

    pub fn count(&self, severity: ReviewSeverity) -> usize {
        self.comments.iter().filter(|c| c.severity == severity).count()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn comments(&self) -> &[ReviewComment] {
        &self.comments
    }
}

impl StructuredOutput for CodeReviewReport {
    fn validate(&self) -> Result<(), String> {
        self.comments.iter().try_for_each(ReviewComment::validate)
    }
}

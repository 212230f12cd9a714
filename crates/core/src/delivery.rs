//! Values handed from the plan step to the version-control port.

use crate::reasoning::StructuredOutput;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileContent {
    /// Repository-relative path
    pub path: String,
    pub content: String,
    #[serde(default = "default_is_new")]
    pub is_new: bool,
}

fn default_is_new() -> bool {
    true
}

/// Everything a single commit needs. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitIntent {
    pub branch: String,
    pub message: String,
    pub files: Vec<FileContent>,
}

impl CommitIntent {
    pub fn new(branch: impl Into<String>, message: impl Into<String>, files: Vec<FileContent>) -> Self {
        Self {
            branch: branch.into(),
            message: message.into(),
            files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// One file touched by a merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub file_path: String,
    /// Previous path for renames and modifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    pub change_type: ChangeType,
    #[serde(default)]
    pub diff: String,
    #[serde(default)]
    pub is_binary: bool,
}

/// Render a diff set as plain text, in the order given.
pub fn render_diff(changes: &[FileChange]) -> String {
    let mut out = String::new();
    for change in changes {
        out.push_str(&format!("--- {} ({:?})\n", change.file_path, change.change_type));
        if change.is_binary {
            out.push_str("[binary file omitted]\n");
        } else {
            out.push_str(&change.diff);
            if !change.diff.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}

/// What the model proposes for a scaffold: one commit worth of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScaffoldPlan {
    /// Conventional-commit message
    pub commit_message: String,
    #[serde(default)]
    pub files: Vec<FileContent>,
}

impl ScaffoldPlan {
    pub fn into_commit(self, branch: impl Into<String>) -> CommitIntent {
        CommitIntent::new(branch, self.commit_message, self.files)
    }
}

impl StructuredOutput for ScaffoldPlan {
    fn validate(&self) -> Result<(), String> {
        if self.commit_message.trim().is_empty() {
            return Err("commit_message is empty".into());
        }
        match self.files.iter().find(|f| f.path.trim().is_empty()) {
            Some(_) => Err("a generated file has an empty path".into()),
            None => Ok(()),
        }
    }
}

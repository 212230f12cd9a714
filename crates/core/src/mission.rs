//! Mission: a tracker ticket as the engine sees it.
//!
//! The inbound event mapping produces a [`Mission`] with the free-text
//! description plus the structured configuration block extracted from it.
//! The engine never mutates a mission; tracker changes go through the
//! [`Tracker`](crate::capability::Tracker) port.

use crate::error::MissionError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub project_key: String,
    #[serde(default)]
    pub issue_type: String,
    #[serde(default)]
    pub description: Description,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Description {
    /// The ticket text, exactly as the reporter wrote it
    #[serde(default)]
    pub raw_content: String,

    #[serde(default)]
    pub config: MissionConfig,
}

/// Structured configuration block embedded in the ticket description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfig {
    /// Scaffolding contract version; part of the scaffold fingerprint
    #[serde(default = "default_contract_version")]
    pub version: String,

    #[serde(default)]
    pub target: TargetRepository,

    #[serde(default)]
    pub parameters: ServiceParameters,

    /// Written by a previous scaffold run, consumed by the review flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_review_params: Option<CodeReviewParams>,
}

fn default_contract_version() -> String {
    "1".into()
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            version: default_contract_version(),
            target: TargetRepository::default(),
            parameters: ServiceParameters::default(),
            code_review_params: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetRepository {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab_project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab_project_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

impl TargetRepository {
    /// Project id when present, otherwise the project path, otherwise empty.
    pub fn project_ref(&self) -> &str {
        self.gitlab_project_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.gitlab_project_path.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceParameters {
    #[serde(default)]
    pub service_name: String,

    /// Anything else the ticket author put under `parameters`
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReviewParams {
    #[serde(default)]
    pub review_request_url: String,

    #[serde(default)]
    pub gitlab_project_id: String,

    #[serde(default)]
    pub source_branch_name: String,
}

impl CodeReviewParams {
    /// All three fields must be present and non-blank.
    pub fn validate(&self, mission_key: &str) -> Result<(), MissionError> {
        for (field, value) in [
            ("review_request_url", &self.review_request_url),
            ("gitlab_project_id", &self.gitlab_project_id),
            ("source_branch_name", &self.source_branch_name),
        ] {
            if value.trim().is_empty() {
                return Err(MissionError::MissingField {
                    key: mission_key.to_string(),
                    field: format!("code_review_params.{field}"),
                });
            }
        }
        Ok(())
    }

    /// Merge request iid from `.../merge_requests/<n>` or a bare number.
    pub fn merge_request_iid(&self, mission_key: &str) -> Result<String, MissionError> {
        let url = self.review_request_url.trim();
        if !url.is_empty() && url.chars().all(|c| c.is_ascii_digit()) {
            return Ok(url.to_string());
        }
        const MARKER: &str = "merge_requests/";
        if let Some(pos) = url.find(MARKER) {
            let digits: String = url[pos + MARKER.len()..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if !digits.is_empty() {
                return Ok(digits);
            }
        }
        Err(MissionError::InvalidField {
            key: mission_key.to_string(),
            field: "code_review_params.review_request_url".into(),
            reason: format!("cannot extract a merge request id from '{url}'"),
        })
    }
}

impl Mission {
    pub fn service_name(&self) -> &str {
        self.description.config.parameters.service_name.trim()
    }

    /// Per-mission model candidates from `parameters.model_hints`, given
    /// either as a list or as one comma-separated string.
    pub fn model_hints(&self) -> Vec<String> {
        match self.description.config.parameters.extra.get("model_hints") {
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(serde_json::Value::String(list)) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Review parameters, or a `MissingField` error naming the block.
    pub fn code_review_params(&self) -> Result<&CodeReviewParams, MissionError> {
        self.description
            .config
            .code_review_params
            .as_ref()
            .ok_or_else(|| MissionError::MissingField {
                key: self.key.clone(),
                field: "code_review_params".into(),
            })
    }
}

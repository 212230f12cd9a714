//! Filesystem documentation adapter.
//!
//! Serves Markdown files from a directory. A query or service name is
//! slugged and looked up as `<slug>.md`; when that file is missing the
//! adapter falls back to `architecture.md` / `conventions.md`, then to
//! built-in general guidelines.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::json;
use ticketsmith_core::{CapabilityRole, Documentation, ProviderFailure, ToolDefinition, ToolSurface};
use tracing::debug;

use crate::args::{required_str, unknown_tool};

pub const DOCS_SYSTEM: &str = "filesystem";

pub const DEFAULT_ARCHITECTURE: &str = "\
# General Architecture Guidelines

Follow Clean Architecture principles.
- Isolate the domain from infrastructure.
- Use ports and adapters.
- Keep configuration outside the code.
";

pub const DEFAULT_CONVENTIONS: &str = "\
# General Coding Conventions

- Small, focused modules with descriptive names.
- Errors are handled explicitly and never swallowed.
- Every public behavior is covered by a test.
";

pub struct FilesystemDocs {
    root: Option<PathBuf>,
}

impl FilesystemDocs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    /// An adapter without a directory; every lookup returns the defaults.
    pub fn builtin() -> Self {
        Self { root: None }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    async fn lookup(&self, query: &str, fallback_file: &str, default: &str) -> Result<String, ProviderFailure> {
        let Some(root) = &self.root else {
            return Ok(default.to_string());
        };
        if query.contains("..") || query.starts_with('/') || query.starts_with('\\') {
            return Err(ProviderFailure::permanent(
                DOCS_SYSTEM,
                format!("invalid documentation query '{query}'"),
            ));
        }

        let slug = slugify(query);
        let candidates = [
            (!slug.is_empty()).then(|| root.join(format!("{slug}.md"))),
            Some(root.join(fallback_file)),
        ];
        for path in candidates.into_iter().flatten() {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    debug!(path = %path.display(), "Documentation page found");
                    return Ok(content);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(ProviderFailure::transient(
                        DOCS_SYSTEM,
                        format!("failed to read {}: {e}", path.display()),
                    ));
                }
            }
        }
        Ok(default.to_string())
    }
}

/// Lower-case, with runs of anything outside `[a-z0-9]` collapsed to `-`.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[async_trait]
impl ToolSurface for FilesystemDocs {
    fn role(&self) -> CapabilityRole {
        CapabilityRole::Documentation
    }

    fn system(&self) -> &str {
        DOCS_SYSTEM
    }

    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, ProviderFailure> {
        Ok(vec![
            ToolDefinition {
                name: "get_architecture_context".into(),
                description: "Fetch architecture guidance for a page id or search query.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
            },
            ToolDefinition {
                name: "get_project_context".into(),
                description: "Fetch the coding conventions of a service.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {"service_name": {"type": "string"}},
                    "required": ["service_name"]
                }),
            },
        ])
    }

    async fn execute_tool(&self, name: &str, args: serde_json::Value) -> Result<String, ProviderFailure> {
        match name {
            "get_architecture_context" => {
                self.get_architecture_context(required_str(DOCS_SYSTEM, &args, "query")?).await
            }
            "get_project_context" => {
                self.get_project_context(required_str(DOCS_SYSTEM, &args, "service_name")?).await
            }
            other => Err(unknown_tool(DOCS_SYSTEM, other)),
        }
    }
}

#[async_trait]
impl Documentation for FilesystemDocs {
    async fn get_architecture_context(&self, id_or_query: &str) -> Result<String, ProviderFailure> {
        self.lookup(id_or_query, "architecture.md", DEFAULT_ARCHITECTURE).await
    }

    async fn get_project_context(&self, service_name: &str) -> Result<String, ProviderFailure> {
        self.lookup(service_name, "conventions.md", DEFAULT_CONVENTIONS).await
    }
}

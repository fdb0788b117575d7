//! `ish:featurePack:list`: lists the feature packs installed in the project.

use std::path::PathBuf;

use serde_json::{json, Value};

use super::{into_output, optional_str};
use crate::error::ToolError;
use crate::mcp::router::{Tool, ToolOutput};
use crate::project::ProjectContext;
use crate::providers::resources::markdown_heading;

/// Lists the sub-directories of the feature pack root.
///
/// A pack's description is the first heading of its `README.md`, if any.
#[derive(Debug, Clone)]
pub struct FeaturePackListTool {
    root: PathBuf,
}

impl FeaturePackListTool {
    /// Creates the tool for packs under `root` (relative to the project root
    /// unless absolute).
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl Tool for FeaturePackListTool {
    fn name(&self) -> &str {
        "ish:featurePack:list"
    }

    fn description(&self) -> &str {
        "List the feature packs available to the project, optionally filtered by a \
         case-insensitive substring of the pack name."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filter": {
                    "type": "string",
                    "description": "Only list packs whose name contains this text"
                }
            },
            "additionalProperties": false
        })
    }

    fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "featurePacks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "path": { "type": "string" },
                            "description": { "type": ["string", "null"] }
                        },
                        "required": ["name", "path"]
                    }
                }
            },
            "required": ["featurePacks"]
        })
    }

    fn call(&self, project: &ProjectContext, params: &Value) -> Result<ToolOutput, ToolError> {
        let filter = optional_str(params, "filter").map(str::to_lowercase);

        let root = project.resolve(&self.root);
        if !root.is_dir() {
            tracing::debug!(root = %root.display(), "No feature pack directory");
            return Ok(into_output(json!({ "featurePacks": [] })));
        }
        let root = project.confine(&root)?;

        let entries = std::fs::read_dir(&root).map_err(|source| ToolError::Io {
            path: root.clone(),
            source,
        })?;

        let mut packs: Vec<(String, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                Some((name, entry.path()))
            })
            .filter(|(name, _)| {
                filter
                    .as_deref()
                    .map_or(true, |f| name.to_lowercase().contains(f))
            })
            .collect();
        packs.sort_by(|a, b| a.0.cmp(&b.0));

        let listed: Vec<Value> = packs
            .into_iter()
            .map(|(name, path)| {
                let relative = path
                    .strip_prefix(project.root())
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");
                json!({
                    "name": name,
                    "path": relative,
                    "description": markdown_heading(&path.join("README.md")),
                })
            })
            .collect();

        Ok(into_output(json!({ "featurePacks": listed })))
    }
}

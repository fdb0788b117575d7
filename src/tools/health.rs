//! `health/version`: reports the server name and version.

use serde_json::{json, Value};

use crate::error::ToolError;
use crate::mcp::protocol::{PROTOCOL_VERSION, SERVER_NAME};
use crate::mcp::router::{Tool, ToolOutput};
use crate::project::ProjectContext;

/// Reports server identity; useful as a liveness probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthVersionTool;

impl Tool for HealthVersionTool {
    fn name(&self) -> &str {
        "health/version"
    }

    fn description(&self) -> &str {
        "Report the server name, server version and envelope protocol version."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "version": { "type": "string" },
                "protocolVersion": { "type": "string" }
            },
            "required": ["name", "version", "protocolVersion"]
        })
    }

    fn call(&self, _project: &ProjectContext, _params: &Value) -> Result<ToolOutput, ToolError> {
        Ok(super::into_output(json!({
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "protocolVersion": PROTOCOL_VERSION,
        })))
    }
}

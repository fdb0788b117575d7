//! Tool registry and dispatch.
//!
//! Tools are registered under their name in an insertion-ordered map. A tool
//! is either [`RegisteredTool::Dedicated`] (hand-written) or
//! [`RegisteredTool::Dynamic`] (generated, e.g. from external command
//! metadata). Registration precedence:
//!
//! | existing  | incoming  | effect            |
//! |-----------|-----------|-------------------|
//! | none      | any       | added             |
//! | Dedicated | Dynamic   | ignored           |
//! | Dynamic   | Dedicated | replaced          |
//! | Dedicated | Dedicated | replaced          |
//! | Dynamic   | Dynamic   | replaced          |
//!
//! Dispatch validates parameters against the tool's input schema before the
//! tool runs, and converts tool errors and panics into error bodies so a
//! single failing tool never stops the server.

use std::panic::{catch_unwind, AssertUnwindSafe};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mcp::protocol::ErrorBody;
use crate::mcp::schema::SchemaValidator;
use crate::project::ProjectContext;

/// The object a tool returns on success.
pub type ToolOutput = Map<String, Value>;

/// A named, schema-described unit of functionality.
pub trait Tool: Send + Sync {
    /// Unique tool name; also the method name callers dispatch on.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Schema the parameters must satisfy before [`Tool::call`] runs.
    fn input_schema(&self) -> Value;

    /// Schema describing the returned object.
    fn output_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    /// Runs the tool.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the tool cannot complete.
    fn call(&self, project: &ProjectContext, params: &Value) -> Result<ToolOutput, ToolError>;
}

/// Registration priority of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    /// Hand-written implementation; wins over dynamic ones.
    Dedicated,
    /// Generically constructed implementation.
    Dynamic,
}

/// A tool tagged with its registration priority.
pub enum RegisteredTool {
    /// Hand-written implementation.
    Dedicated(Box<dyn Tool>),
    /// Generically constructed implementation.
    Dynamic(Box<dyn Tool>),
}

impl RegisteredTool {
    /// Wraps a dedicated tool.
    pub fn dedicated(tool: impl Tool + 'static) -> Self {
        Self::Dedicated(Box::new(tool))
    }

    /// Wraps a dynamic tool.
    pub fn dynamic(tool: impl Tool + 'static) -> Self {
        Self::Dynamic(Box::new(tool))
    }

    /// Returns the registration priority.
    #[must_use]
    pub const fn kind(&self) -> ToolKind {
        match self {
            Self::Dedicated(_) => ToolKind::Dedicated,
            Self::Dynamic(_) => ToolKind::Dynamic,
        }
    }

    /// Returns the wrapped tool.
    #[must_use]
    pub fn tool(&self) -> &dyn Tool {
        match self {
            Self::Dedicated(tool) | Self::Dynamic(tool) => tool.as_ref(),
        }
    }
}

/// What [`RequestRouter::register`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// No tool had this name.
    Added,
    /// An existing tool was overwritten.
    Replaced,
    /// A dynamic tool was dropped in favour of an existing dedicated one.
    Ignored,
}

/// A tool definition for the `listTools` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
    /// JSON Schema for the tool's result.
    pub output_schema: Value,
}

/// Registry of tools and dispatcher for tool invocations.
#[derive(Default)]
pub struct RequestRouter {
    tools: IndexMap<String, RegisteredTool>,
}

impl RequestRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, applying the dedicated/dynamic precedence rule.
    pub fn register(&mut self, entry: RegisteredTool) -> Registration {
        let name = entry.tool().name().to_string();

        let outcome = match self.tools.get(&name).map(RegisteredTool::kind) {
            None => Registration::Added,
            Some(ToolKind::Dedicated) if entry.kind() == ToolKind::Dynamic => {
                Registration::Ignored
            }
            Some(_) => Registration::Replaced,
        };

        match outcome {
            Registration::Ignored => {
                tracing::debug!(tool = %name, "Dynamic tool shadowed by dedicated tool");
            }
            Registration::Added | Registration::Replaced => {
                tracing::debug!(tool = %name, kind = ?entry.kind(), ?outcome, "Registered tool");
                // IndexMap keeps the original position when overwriting.
                self.tools.insert(name, entry);
            }
        }
        outcome
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns `true` if a tool is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Returns the kind of the tool registered under `name`.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<ToolKind> {
        self.tools.get(name).map(RegisteredTool::kind)
    }

    /// Lists every registered tool in registration order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|entry| {
                let tool = entry.tool();
                ToolDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    input_schema: tool.input_schema(),
                    output_schema: tool.output_schema(),
                }
            })
            .collect()
    }

    /// Invokes the tool registered as `method`.
    ///
    /// # Errors
    ///
    /// Returns an error body for an unknown method (`40400`), a schema
    /// violation (`40001`, tool not run) or a tool failure or panic (`500`).
    pub fn dispatch(
        &self,
        method: &str,
        params: &Value,
        project: &ProjectContext,
    ) -> Result<ToolOutput, ErrorBody> {
        let Some(entry) = self.tools.get(method) else {
            return Err(ErrorBody::method_not_found(method));
        };
        let tool = entry.tool();

        let violations = SchemaValidator::validate(params, &tool.input_schema());
        if !violations.is_empty() {
            tracing::debug!(tool = %method, count = violations.len(), "Rejected invalid params");
            return Err(ErrorBody::validation_failed(violations));
        }

        let output = match catch_unwind(AssertUnwindSafe(|| tool.call(project, params))) {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::warn!(tool = %method, error = %e, "Tool failed");
                return Err(ErrorBody::internal(e.to_string()));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(tool = %method, panic = %message, "Tool panicked");
                return Err(ErrorBody::internal(format!("tool panicked: {message}")));
            }
        };

        let output_violations =
            SchemaValidator::validate(&Value::Object(output.clone()), &tool.output_schema());
        if !output_violations.is_empty() {
            tracing::warn!(
                tool = %method,
                violations = ?output_violations,
                "Tool result does not match its output schema"
            );
        }

        Ok(output)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

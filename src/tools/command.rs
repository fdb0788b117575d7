//! Dynamic tools backed by external commands.
//!
//! Each configured command becomes one tool. Caller parameters are rendered
//! as long flags after the fixed arguments, in the order the options are
//! declared:
//!
//! | Value          | Flag               |
//! |----------------|--------------------|
//! | `true`         | `--name`           |
//! | `false`        | *(omitted)*        |
//! | string         | `--name=value`     |
//! | anything else  | `--name=<json>`    |

use std::process::Command;

use serde_json::{json, Map, Value};

use crate::config::{CommandConfig, CommandOption};
use crate::error::ToolError;
use crate::mcp::router::{Tool, ToolOutput};
use crate::project::ProjectContext;

/// A tool that runs an external program in the project root.
#[derive(Debug, Clone)]
pub struct CommandTool {
    config: CommandConfig,
}

impl CommandTool {
    /// Wraps a configured command.
    #[must_use]
    pub const fn new(config: CommandConfig) -> Self {
        Self { config }
    }

    /// Builds the argument list for a call.
    fn arguments(&self, params: &Value) -> Vec<String> {
        let mut args = self.config.args.clone();
        for option in &self.config.options {
            match params.get(&option.name) {
                None | Some(Value::Null | Value::Bool(false)) => {}
                Some(Value::Bool(true)) => args.push(format!("--{}", option.name)),
                Some(Value::String(s)) => args.push(format!("--{}={s}", option.name)),
                Some(other) => args.push(format!("--{}={other}", option.name)),
            }
        }
        args
    }
}

fn option_schema(option: &CommandOption) -> Value {
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!(option.kind));
    if !option.description.is_empty() {
        schema.insert("description".to_string(), json!(option.description));
    }
    if let Some(allowed) = &option.allowed {
        schema.insert("enum".to_string(), json!(allowed));
    }
    Value::Object(schema)
}

impl Tool for CommandTool {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn description(&self) -> &str {
        if self.config.description.is_empty() {
            &self.config.program
        } else {
            &self.config.description
        }
    }

    fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .config
            .options
            .iter()
            .map(|option| (option.name.clone(), option_schema(option)))
            .collect();
        let required: Vec<&str> = self
            .config
            .options
            .iter()
            .filter(|option| option.required)
            .map(|option| option.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }

    fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "exitCode": { "type": "integer" },
                "stdout": { "type": "string" },
                "stderr": { "type": "string" }
            },
            "required": ["exitCode", "stdout", "stderr"]
        })
    }

    fn call(&self, project: &ProjectContext, params: &Value) -> Result<ToolOutput, ToolError> {
        let args = self.arguments(params);
        tracing::debug!(program = %self.config.program, ?args, "Running command");

        let output = Command::new(&self.config.program)
            .args(&args)
            .current_dir(project.root())
            .output()
            .map_err(|source| ToolError::CommandSpawn {
                program: self.config.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ToolError::CommandFailed {
                program: self.config.program.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(super::into_output(json!({
            "exitCode": output.status.code().unwrap_or(0),
            "stdout": stdout,
            "stderr": stderr,
        })))
    }
}

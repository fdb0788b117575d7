//! Built-in tools.
//!
//! - **Dedicated** tools are written by hand in this module tree.
//! - **Dynamic** tools are generated from the `commands` section of the
//!   configuration, one per external command.
//!
//! Dynamic tools are registered first so that a dedicated tool of the same
//! name replaces its generic counterpart.

mod command;
mod feature_pack;
mod health;
mod lifecycle;

pub use command::CommandTool;
pub use feature_pack::FeaturePackListTool;
pub use health::HealthVersionTool;
pub use lifecycle::{ProjectModeTool, ProjectStateTool, ProjectTransitionTool};

use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::ToolError;
use crate::mcp::router::{Registration, RegisteredTool, RequestRouter};

/// Returns the hand-written tools.
#[must_use]
pub fn dedicated_tools(config: &Config) -> Vec<RegisteredTool> {
    vec![
        RegisteredTool::dedicated(HealthVersionTool),
        RegisteredTool::dedicated(ProjectStateTool::new(config.state_dir.clone())),
        RegisteredTool::dedicated(ProjectTransitionTool::new(config.state_dir.clone())),
        RegisteredTool::dedicated(ProjectModeTool::new(config.state_dir.clone())),
        RegisteredTool::dedicated(FeaturePackListTool::new(config.feature_packs.root.clone())),
    ]
}

/// Returns one dynamic tool per configured external command.
#[must_use]
pub fn dynamic_tools(config: &Config) -> Vec<RegisteredTool> {
    config
        .commands
        .iter()
        .cloned()
        .map(|command| RegisteredTool::dynamic(CommandTool::new(command)))
        .collect()
}

/// Registers every built-in tool: dynamic ones first, then dedicated ones.
pub fn register_all(router: &mut RequestRouter, config: &Config) {
    for entry in dynamic_tools(config).into_iter().chain(dedicated_tools(config)) {
        let name = entry.tool().name().to_string();
        if router.register(entry) == Registration::Replaced {
            tracing::info!(tool = %name, "Dedicated tool replaces configured command");
        }
    }
}

/// Reads an optional string parameter.
fn optional_str<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params.get(name).and_then(Value::as_str)
}

/// Reads a required string parameter.
///
/// Schema validation has already run, so a failure here means the schema and
/// the tool disagree.
fn required_str<'a>(params: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    optional_str(params, name).ok_or_else(|| ToolError::InvalidParameter {
        name: name.to_string(),
        message: "expected a string".to_string(),
    })
}

/// Converts a serialisable value into a tool output object.
fn into_output(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::router::ToolKind;

    #[test]
    fn dedicated_tool_wins_over_configured_command() {
        let config: Config = serde_json::from_str(
            r#"{
                "commands": [
                    { "name": "ish:featurePack:list", "description": "via CLI", "program": "ish" },
                    { "name": "ish:cache:clear", "description": "Clear caches", "program": "ish",
                      "args": ["cache:clear"] }
                ]
            }"#,
        )
        .unwrap();

        let mut router = RequestRouter::new();
        register_all(&mut router, &config);

        assert_eq!(router.kind_of("ish:featurePack:list"), Some(ToolKind::Dedicated));
        assert_eq!(router.kind_of("ish:cache:clear"), Some(ToolKind::Dynamic));
        assert_eq!(router.len(), dedicated_tools(&config).len() + 1);
    }

    #[test]
    fn builtin_tools_declare_object_schemas() {
        let mut router = RequestRouter::new();
        register_all(&mut router, &Config::default());

        for tool in router.list_tools() {
            assert!(!tool.name.is_empty());
            assert!(!tool.description.is_empty(), "{} lacks a description", tool.name);
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert_eq!(tool.output_schema["type"], "object", "{}", tool.name);
        }
    }

    #[test]
    fn into_output_wraps_non_objects() {
        let out = into_output(Value::from(3));
        assert_eq!(out["value"], 3);
    }
}

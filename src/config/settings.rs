//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::collections::HashSet;
use std::path::{Component, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Root directory of the managed project.
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    /// Extra directories outside the project root that file-backed providers
    /// and tools may read.
    #[serde(default)]
    pub allowed_paths: Vec<PathBuf>,

    /// Directory (relative to the project root) holding the state record.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Documentation resources.
    #[serde(default = "SourceConfig::documentation")]
    pub documentation: SourceConfig,

    /// Template resources.
    #[serde(default = "SourceConfig::templates")]
    pub templates: SourceConfig,

    /// Prompt definition directories.
    #[serde(default)]
    pub prompts: PromptConfig,

    /// Feature pack directory.
    #[serde(default)]
    pub feature_packs: FeaturePackConfig,

    /// External commands exposed as dynamic tools.
    #[serde(default)]
    pub commands: Vec<CommandConfig>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            _schema: None,
            _comment: None,
            project_root: default_project_root(),
            allowed_paths: Vec::new(),
            state_dir: default_state_dir(),
            documentation: SourceConfig::documentation(),
            templates: SourceConfig::templates(),
            prompts: PromptConfig::default(),
            feature_packs: FeaturePackConfig::default(),
            commands: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "state_dir must not be empty".to_string(),
            });
        }
        if self.state_dir.is_absolute()
            || self
                .state_dir
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "state_dir '{}' must be relative to the project root",
                    self.state_dir.display()
                ),
            });
        }

        let sources = [
            ("documentation", &self.documentation),
            ("templates", &self.templates),
        ];
        for (section, source) in sources {
            if let Err(e) = glob::Pattern::new(&source.pattern) {
                return Err(ConfigError::ValidationError {
                    message: format!("Invalid {section} pattern '{}': {e}", source.pattern),
                });
            }
        }

        let mut seen = HashSet::new();
        for command in &self.commands {
            command.validate()?;
            if !seen.insert(command.name.as_str()) {
                return Err(ConfigError::ValidationError {
                    message: format!("Duplicate command name '{}'", command.name),
                });
            }
        }
        Ok(())
    }
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".ish")
}

/// A set of directories scanned for file-backed resources.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Directories to scan, relative to the project root unless absolute.
    #[serde(default)]
    pub roots: Vec<PathBuf>,

    /// Glob pattern applied inside each root.
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

impl SourceConfig {
    fn documentation() -> Self {
        Self {
            roots: vec![PathBuf::from("docs")],
            pattern: "**/*.md".to_string(),
        }
    }

    fn templates() -> Self {
        Self {
            roots: vec![PathBuf::from("templates")],
            pattern: default_pattern(),
        }
    }
}

fn default_pattern() -> String {
    "**/*".to_string()
}

/// Prompt definition configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    /// Directories holding `*.json` prompt definitions.
    #[serde(default = "default_prompt_roots")]
    pub roots: Vec<PathBuf>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            roots: default_prompt_roots(),
        }
    }
}

fn default_prompt_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("prompts")]
}

/// Feature pack configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeaturePackConfig {
    /// Directory whose sub-directories are feature packs.
    #[serde(default = "default_feature_pack_root")]
    pub root: PathBuf,
}

impl Default for FeaturePackConfig {
    fn default() -> Self {
        Self {
            root: default_feature_pack_root(),
        }
    }
}

fn default_feature_pack_root() -> PathBuf {
    PathBuf::from("feature-packs")
}

/// An external command exposed as a dynamic tool.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    /// Tool name (e.g. `ish:featurePack:list`).
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Program to execute.
    pub program: String,

    /// Fixed arguments passed before any option flags.
    #[serde(default)]
    pub args: Vec<String>,

    /// Options accepted from the caller, rendered as `--name=value`.
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

impl CommandConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "command name must not be empty".to_string(),
            });
        }
        if self.program.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: format!("command '{}' has an empty program", self.name),
            });
        }
        for option in &self.options {
            if !OPTION_TYPES.contains(&option.kind.as_str()) {
                return Err(ConfigError::ValidationError {
                    message: format!(
                        "Invalid type '{}' for option '{}' of command '{}'. Must be one of: {}",
                        option.kind,
                        option.name,
                        self.name,
                        OPTION_TYPES.join(", ")
                    ),
                });
            }
        }
        Ok(())
    }
}

const OPTION_TYPES: &[&str] = &["string", "number", "integer", "boolean"];

/// A single option of an external command.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandOption {
    /// Option name, used both as the schema property and the flag name.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Schema type: "string", "number", "integer" or "boolean".
    #[serde(rename = "type", default = "default_option_type")]
    pub kind: String,

    /// Whether the caller must supply the option.
    #[serde(default)]
    pub required: bool,

    /// Allowed values, if restricted.
    #[serde(rename = "enum", default)]
    pub allowed: Option<Vec<serde_json::Value>>,
}

fn default_option_type() -> String {
    "string".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.project_root, PathBuf::from("."));
        assert_eq!(config.state_dir, PathBuf::from(".ish"));
        assert_eq!(config.documentation.roots, vec![PathBuf::from("docs")]);
        assert_eq!(config.documentation.pattern, "**/*.md");
        assert_eq!(config.templates.pattern, "**/*");
        assert!(config.commands.is_empty());
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "./config.schema.json",
            "_comment": "project settings",
            "project_root": "/work/shop",
            "allowed_paths": ["/work/shared-docs"],
            "state_dir": ".workflow",
            "documentation": { "roots": ["docs", "/work/shared-docs"], "pattern": "**/*.md" },
            "templates": { "roots": ["stubs"] },
            "prompts": { "roots": ["agent-prompts"] },
            "feature_packs": { "root": "packs" },
            "commands": [
                {
                    "name": "ish:featurePack:list",
                    "description": "List feature packs via the ish CLI",
                    "program": "ish",
                    "args": ["featurePack:list"],
                    "options": [
                        { "name": "format", "type": "string", "enum": ["json", "table"] },
                        { "name": "verbose", "type": "boolean" }
                    ]
                }
            ],
            "logging": { "level": "debug" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.project_root, PathBuf::from("/work/shop"));
        assert_eq!(config.state_dir, PathBuf::from(".workflow"));
        assert_eq!(config.documentation.roots.len(), 2);
        assert_eq!(config.templates.pattern, "**/*");
        assert_eq!(config.prompts.roots, vec![PathBuf::from("agent-prompts")]);
        assert_eq!(config.feature_packs.root, PathBuf::from("packs"));
        assert_eq!(config.commands.len(), 1);
        assert_eq!(config.commands[0].options[1].kind, "boolean");
        assert!(!config.commands[0].options[0].required);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn reject_absolute_state_dir() {
        let json = r#"{ "state_dir": "/var/state" }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_escaping_state_dir() {
        let json = r#"{ "state_dir": "../elsewhere" }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_duplicate_commands() {
        let json = r#"{
            "commands": [
                { "name": "build", "program": "make" },
                { "name": "build", "program": "cargo" }
            ]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate command name"));
    }

    #[test]
    fn reject_invalid_option_type() {
        let json = r#"{
            "commands": [
                { "name": "build", "program": "make",
                  "options": [ { "name": "target", "type": "object" } ] }
            ]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_invalid_pattern() {
        let json = r#"{ "templates": { "roots": ["stubs"], "pattern": "[unclosed" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("templates pattern"));
    }

    #[test]
    fn reject_empty_program() {
        let json = r#"{ "commands": [ { "name": "build", "program": "  " } ] }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }
}

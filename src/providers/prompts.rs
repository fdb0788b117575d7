//! Prompt templates and their providers.
//!
//! A [`PromptTemplate`] is immutable. Binding arguments produces a separate
//! [`BoundPrompt`] value whose [`BoundPrompt::messages`] depends only on the
//! template and the bound arguments.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PromptError;
use crate::project::ProjectContext;
use crate::providers::PromptProvider;

/// A declared prompt argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptArgument {
    /// Argument name, referenced as `{{name}}` in message text.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Whether binding fails without this argument.
    #[serde(default)]
    pub required: bool,
}

impl PromptArgument {
    fn new(name: &str, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required,
        }
    }
}

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The caller's side.
    User,
    /// The model's side.
    Assistant,
}

/// A message whose text may contain `{{argument}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageTemplate {
    /// Speaker.
    pub role: Role,
    /// Text with placeholders.
    pub text: String,
}

/// A prompt as listed by `listPrompts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptDescriptor {
    /// Unique prompt name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Declared arguments, in order.
    pub arguments: Vec<PromptArgument>,
}

/// A named prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptTemplate {
    /// Unique prompt name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Declared arguments, in order.
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
    /// Message templates, in order.
    pub messages: Vec<MessageTemplate>,
}

impl PromptTemplate {
    /// Returns the listing entry for this template.
    #[must_use]
    pub fn descriptor(&self) -> PromptDescriptor {
        PromptDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self.arguments.clone(),
        }
    }

    /// Binds `arguments`, producing a prompt ready to render.
    ///
    /// `null` values count as absent. Non-string values are bound as their
    /// JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::MissingArguments`] listing every required
    /// argument that was not supplied.
    pub fn bind(&self, arguments: &Map<String, Value>) -> Result<BoundPrompt, PromptError> {
        let values: BTreeMap<String, String> = arguments
            .iter()
            .filter_map(|(name, value)| match value {
                Value::Null => None,
                Value::String(s) => Some((name.clone(), s.clone())),
                other => Some((name.clone(), other.to_string())),
            })
            .collect();

        let missing: Vec<String> = self
            .arguments
            .iter()
            .filter(|arg| arg.required && !values.contains_key(&arg.name))
            .map(|arg| arg.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(PromptError::MissingArguments { names: missing });
        }

        Ok(BoundPrompt {
            template: self.clone(),
            values,
        })
    }
}

/// Message content. Only text is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    /// Speaker.
    pub role: Role,
    /// Content.
    pub content: MessageContent,
}

impl PromptMessage {
    /// Returns the message text.
    #[must_use]
    pub fn text(&self) -> &str {
        match &self.content {
            MessageContent::Text { text } => text,
        }
    }
}

/// A template with its arguments bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundPrompt {
    template: PromptTemplate,
    values: BTreeMap<String, String>,
}

impl BoundPrompt {
    /// Returns the prompt name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.template.name
    }

    /// Returns the prompt description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.template.description
    }

    /// Renders the messages.
    ///
    /// Placeholders naming a bound argument are replaced by its value;
    /// placeholders naming an unbound declared argument become empty;
    /// any other placeholder is left as written.
    #[must_use]
    pub fn messages(&self) -> Vec<PromptMessage> {
        self.template
            .messages
            .iter()
            .map(|message| PromptMessage {
                role: message.role,
                content: MessageContent::Text {
                    text: self.render(&message.text),
                },
            })
            .collect()
    }

    fn render(&self, text: &str) -> String {
        placeholder()
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                if let Some(value) = self.values.get(name) {
                    value.clone()
                } else if self.template.arguments.iter().any(|a| a.name == name) {
                    String::new()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_-]*)\s*\}\}").expect("valid placeholder regex")
    })
}

/// A provider holding templates given at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticPromptProvider {
    templates: Vec<PromptTemplate>,
}

impl StaticPromptProvider {
    /// Creates a provider over `templates`, listed in the given order.
    #[must_use]
    pub const fn new(templates: Vec<PromptTemplate>) -> Self {
        Self { templates }
    }

    /// Prompts shipped with the server.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![
            PromptTemplate {
                name: "stage-review".to_string(),
                description: "Review the work done for a lifecycle stage before locking it"
                    .to_string(),
                arguments: vec![
                    PromptArgument::new("stage", "Stage being completed", true),
                    PromptArgument::new("notes", "Anything the reviewer should focus on", false),
                ],
                messages: vec![
                    MessageTemplate {
                        role: Role::User,
                        text: "We are about to complete the {{stage}} stage. Review the work \
                               for this stage and list anything that blocks locking it.\n{{notes}}"
                            .to_string(),
                    },
                    MessageTemplate {
                        role: Role::Assistant,
                        text: "I will check the {{stage}} deliverables against the project \
                               state and report blocking issues first."
                            .to_string(),
                    },
                ],
            },
            PromptTemplate {
                name: "next-step".to_string(),
                description: "Suggest the next action for the current lifecycle stage"
                    .to_string(),
                arguments: vec![
                    PromptArgument::new("state", "Current lifecycle stage", true),
                    PromptArgument::new("mode", "Workflow mode (quick or standard)", false),
                ],
                messages: vec![MessageTemplate {
                    role: Role::User,
                    text: "The project is in stage {{state}} ({{mode}} mode). What is the \
                           single most useful next step?"
                        .to_string(),
                }],
            },
        ])
    }
}

impl PromptProvider for StaticPromptProvider {
    fn list(&self) -> Vec<PromptDescriptor> {
        self.templates.iter().map(PromptTemplate::descriptor).collect()
    }

    fn template(&self, name: &str) -> Option<PromptTemplate> {
        self.templates.iter().find(|t| t.name == name).cloned()
    }
}

/// A provider loading `*.json` prompt definitions from directories.
///
/// Directories are re-scanned on every call, so edits are visible without a
/// restart. Files that fail to parse are skipped with a warning.
#[derive(Debug, Clone)]
pub struct FilePromptProvider {
    roots: Vec<PathBuf>,
    project: ProjectContext,
}

impl FilePromptProvider {
    /// Creates a provider scanning `roots` (relative to the project root
    /// unless absolute).
    #[must_use]
    pub const fn new(roots: Vec<PathBuf>, project: ProjectContext) -> Self {
        Self { roots, project }
    }

    fn load(&self) -> impl Iterator<Item = PromptTemplate> + '_ {
        self.roots
            .iter()
            .filter_map(|root| {
                let resolved = self.project.resolve(root);
                if !resolved.is_dir() {
                    return None;
                }
                self.project
                    .confine(&resolved)
                    .map_err(|e| {
                        tracing::warn!(root = %root.display(), error = %e, "Skipping prompt root");
                    })
                    .ok()
            })
            .flat_map(|dir| {
                let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
                    .into_iter()
                    .flatten()
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
                    .collect();
                files.sort();
                files
            })
            .filter_map(|path| {
                let path = self.project.confine(&path).ok()?;
                let parsed = std::fs::read_to_string(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|text| {
                        serde_json::from_str::<PromptTemplate>(&text).map_err(|e| e.to_string())
                    });
                match parsed {
                    Ok(template) => Some(template),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping prompt file");
                        None
                    }
                }
            })
    }
}

impl PromptProvider for FilePromptProvider {
    fn list(&self) -> Vec<PromptDescriptor> {
        self.load().map(|t| t.descriptor()).collect()
    }

    fn template(&self, name: &str) -> Option<PromptTemplate> {
        self.load().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn review() -> PromptTemplate {
        StaticPromptProvider::builtin()
            .template("stage-review")
            .unwrap()
    }

    #[test]
    fn bind_renders_placeholders() {
        let bound = review()
            .bind(&args(json!({ "stage": "REVIEW_COMPLETE", "notes": "Check tests." })))
            .unwrap();
        let messages = bound.messages();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert!(messages[0].text().contains("complete the REVIEW_COMPLETE stage"));
        assert!(messages[0].text().ends_with("Check tests."));
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[test]
    fn missing_optional_argument_renders_empty() {
        let bound = review().bind(&args(json!({ "stage": "INIT" }))).unwrap();
        assert!(!bound.messages()[0].text().contains("{{"));
    }

    #[test]
    fn missing_required_argument_is_error() {
        let err = review().bind(&Map::new()).unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingArguments {
                names: vec!["stage".to_string()]
            }
        );
    }

    #[test]
    fn null_counts_as_missing() {
        assert!(review().bind(&args(json!({ "stage": null }))).is_err());
    }

    #[test]
    fn binding_leaves_template_untouched() {
        let template = review();
        let first = template.bind(&args(json!({ "stage": "INIT" }))).unwrap();
        let second = template.bind(&args(json!({ "stage": "ACCEPTED" }))).unwrap();

        assert!(first.messages()[0].text().contains("INIT"));
        assert!(second.messages()[0].text().contains("ACCEPTED"));
        assert_eq!(template, review());
        assert_eq!(first.messages(), first.messages());
    }

    #[test]
    fn non_string_values_and_unknown_placeholders() {
        let template = PromptTemplate {
            name: "t".to_string(),
            description: String::new(),
            arguments: vec![PromptArgument::new("count", "", false)],
            messages: vec![MessageTemplate {
                role: Role::User,
                text: "{{ count }} items, {{unknown}} left".to_string(),
            }],
        };
        let bound = template.bind(&args(json!({ "count": 3 }))).unwrap();
        assert_eq!(bound.messages()[0].text(), "3 items, {{unknown}} left");
    }

    #[test]
    fn message_serialises_with_text_content() {
        let bound = review().bind(&args(json!({ "stage": "INIT" }))).unwrap();
        let value = serde_json::to_value(&bound.messages()[1]).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"]["type"], "text");
        assert!(value["content"]["text"].as_str().unwrap().contains("INIT"));
    }

    #[test]
    fn file_provider_loads_json_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = dir.path().join("prompts");
        std::fs::create_dir(&prompts).unwrap();
        std::fs::write(
            prompts.join("b-release.json"),
            r#"{
                "name": "release-notes",
                "description": "Draft release notes",
                "arguments": [ { "name": "version", "required": true } ],
                "messages": [ { "role": "user", "text": "Draft notes for {{version}}." } ]
            }"#,
        )
        .unwrap();
        std::fs::write(prompts.join("a-broken.json"), "{ nope").unwrap();
        std::fs::write(prompts.join("readme.md"), "# not a prompt").unwrap();

        let ctx = ProjectContext::new(dir.path(), &[]).unwrap();
        let provider = FilePromptProvider::new(vec![PathBuf::from("prompts")], ctx);

        let listed = provider.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "release-notes");
        assert!(listed[0].arguments[0].required);

        let bound = provider
            .template("release-notes")
            .unwrap()
            .bind(&args(json!({ "version": "1.2.0" })))
            .unwrap();
        assert_eq!(bound.messages()[0].text(), "Draft notes for 1.2.0.");
    }

    #[test]
    fn file_provider_without_roots_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ProjectContext::new(dir.path(), &[]).unwrap();
        let provider = FilePromptProvider::new(vec![PathBuf::from("prompts")], ctx);
        assert!(provider.list().is_empty());
        assert!(provider.template("anything").is_none());
    }
}

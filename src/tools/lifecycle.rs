//! Tools over the persisted project lifecycle.
//!
//! Each call re-opens the state record, so the file stays the single source
//! of truth across server processes.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use super::{into_output, required_str};
use crate::error::ToolError;
use crate::mcp::router::{Tool, ToolOutput};
use crate::project::{Mode, ProjectContext, ProjectStateManager, Stage};

fn stage_names() -> Vec<&'static str> {
    Stage::ALL.iter().map(|s| s.as_str()).collect()
}

fn open(project: &ProjectContext, state_dir: &Path) -> Result<ProjectStateManager, ToolError> {
    Ok(ProjectStateManager::open(project.root(), state_dir)?)
}

fn record_output(manager: &ProjectStateManager) -> ToolOutput {
    into_output(json!({
        "state": manager.state(),
        "mode": manager.mode(),
        "lockedStages": manager.locked_stages(),
    }))
}

/// `project/state`: reads the current stage, mode and locked stages.
#[derive(Debug, Clone)]
pub struct ProjectStateTool {
    state_dir: PathBuf,
}

impl ProjectStateTool {
    /// Creates the tool for records under `state_dir`.
    #[must_use]
    pub const fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }
}

impl Tool for ProjectStateTool {
    fn name(&self) -> &str {
        "project/state"
    }

    fn description(&self) -> &str {
        "Show the project's lifecycle stage, workflow mode, locked stages and the next legal stage."
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
                "state": { "type": "string", "enum": stage_names() },
                "mode": { "type": "string", "enum": ["quick", "standard"] },
                "lockedStages": { "type": "array", "items": { "type": "string" } },
                "next": { "type": "string", "enum": stage_names() }
            },
            "required": ["state", "mode", "lockedStages", "next"]
        })
    }

    fn call(&self, project: &ProjectContext, _params: &Value) -> Result<ToolOutput, ToolError> {
        let manager = open(project, &self.state_dir)?;
        let mut out = record_output(&manager);
        out.insert("next".to_string(), json!(manager.state().successor()));
        Ok(out)
    }
}

/// `project/transition`: advances to the next stage if `target` is legal.
#[derive(Debug, Clone)]
pub struct ProjectTransitionTool {
    state_dir: PathBuf,
}

impl ProjectTransitionTool {
    /// Creates the tool for records under `state_dir`.
    #[must_use]
    pub const fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }
}

impl Tool for ProjectTransitionTool {
    fn name(&self) -> &str {
        "project/transition"
    }

    fn description(&self) -> &str {
        "Advance the project to the given lifecycle stage. Only the immediate successor of the \
         current stage is accepted; anything else leaves the state unchanged and reports \
         transitioned=false."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "target": {
                    "type": "string",
                    "enum": stage_names(),
                    "description": "Stage to move to"
                }
            },
            "required": ["target"],
            "additionalProperties": false
        })
    }

    fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "transitioned": { "type": "boolean" },
                "state": { "type": "string" },
                "mode": { "type": "string" },
                "lockedStages": { "type": "array", "items": { "type": "string" } },
                "expected": { "type": "string" }
            },
            "required": ["transitioned", "state", "lockedStages"]
        })
    }

    fn call(&self, project: &ProjectContext, params: &Value) -> Result<ToolOutput, ToolError> {
        let target: Stage = required_str(params, "target")?
            .parse()
            .map_err(|message| ToolError::InvalidParameter {
                name: "target".to_string(),
                message,
            })?;

        let mut manager = open(project, &self.state_dir)?;
        let expected = manager.state().successor();
        let transitioned = manager.transition(target)?;

        let mut out = record_output(&manager);
        out.insert("transitioned".to_string(), json!(transitioned));
        if !transitioned {
            out.insert("expected".to_string(), json!(expected));
        }
        Ok(out)
    }
}

/// `project/mode`: switches between the quick and standard workflows.
#[derive(Debug, Clone)]
pub struct ProjectModeTool {
    state_dir: PathBuf,
}

impl ProjectModeTool {
    /// Creates the tool for records under `state_dir`.
    #[must_use]
    pub const fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }
}

impl Tool for ProjectModeTool {
    fn name(&self) -> &str {
        "project/mode"
    }

    fn description(&self) -> &str {
        "Set the project's workflow mode (quick or standard). The stage is not affected."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "mode": { "type": "string", "enum": ["quick", "standard"] }
            },
            "required": ["mode"],
            "additionalProperties": false
        })
    }

    fn call(&self, project: &ProjectContext, params: &Value) -> Result<ToolOutput, ToolError> {
        let mode: Mode = required_str(params, "mode")?
            .parse()
            .map_err(|message| ToolError::InvalidParameter {
                name: "mode".to_string(),
                message,
            })?;

        let mut manager = open(project, &self.state_dir)?;
        manager.set_mode(mode)?;
        Ok(record_output(&manager))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, ProjectContext, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ProjectContext::new(dir.path(), &[]).unwrap();
        (dir, ctx, PathBuf::from(".ish"))
    }

    #[test]
    fn state_reports_defaults() {
        let (_dir, ctx, state_dir) = setup();
        let out = ProjectStateTool::new(state_dir).call(&ctx, &json!({})).unwrap();

        assert_eq!(out["state"], "INIT");
        assert_eq!(out["mode"], "quick");
        assert_eq!(out["lockedStages"], json!([]));
        assert_eq!(out["next"], "ANALYSIS_COMPLETE");
    }

    #[test]
    fn transition_then_state() {
        let (_dir, ctx, state_dir) = setup();
        let transition = ProjectTransitionTool::new(state_dir.clone());

        let out = transition
            .call(&ctx, &json!({ "target": "ANALYSIS_COMPLETE" }))
            .unwrap();
        assert_eq!(out["transitioned"], true);
        assert_eq!(out["lockedStages"], json!(["INIT"]));

        let state = ProjectStateTool::new(state_dir).call(&ctx, &json!({})).unwrap();
        assert_eq!(state["state"], "ANALYSIS_COMPLETE");
    }

    #[test]
    fn illegal_transition_reports_expected_stage() {
        let (_dir, ctx, state_dir) = setup();
        let out = ProjectTransitionTool::new(state_dir)
            .call(&ctx, &json!({ "target": "ACCEPTED" }))
            .unwrap();

        assert_eq!(out["transitioned"], false);
        assert_eq!(out["state"], "INIT");
        assert_eq!(out["expected"], "ANALYSIS_COMPLETE");
    }

    #[test]
    fn mode_is_persisted() {
        let (_dir, ctx, state_dir) = setup();
        let out = ProjectModeTool::new(state_dir.clone())
            .call(&ctx, &json!({ "mode": "standard" }))
            .unwrap();
        assert_eq!(out["mode"], "standard");

        let manager = ProjectStateManager::open(ctx.root(), &state_dir).unwrap();
        assert_eq!(manager.mode(), Mode::Standard);
    }

    #[test]
    fn corrupt_state_surfaces_as_tool_error() {
        let (dir, ctx, state_dir) = setup();
        std::fs::create_dir_all(dir.path().join(".ish")).unwrap();
        std::fs::write(dir.path().join(".ish/state.json"), "garbage").unwrap();

        let err = ProjectStateTool::new(state_dir)
            .call(&ctx, &json!({}))
            .unwrap_err();
        assert!(matches!(err, ToolError::State(_)));
    }
}

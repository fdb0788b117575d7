//! Persisted project lifecycle state.
//!
//! The workflow is a fixed cycle of seven stages:
//!
//! ```text
//! INIT → ANALYSIS_COMPLETE → ARCHITECTURE_COMPLETE → IMPLEMENTATION_IN_PROGRESS
//!      → IMPLEMENTATION_COMPLETE → REVIEW_COMPLETE → ACCEPTED → INIT …
//! ```
//!
//! Each stage has exactly one legal successor. Moving forward locks the stage
//! being left; wrapping from `ACCEPTED` back to `INIT` clears the locks.
//!
//! The record lives at `<root>/<state_dir>/state.json` and is re-read on
//! every [`ProjectStateManager::open`] and rewritten on every mutation, so
//! separate server processes observe each other's progress.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// File name of the state record inside the state directory.
pub const STATE_FILE: &str = "state.json";

/// A lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Nothing done yet.
    #[default]
    Init,
    /// Requirements analysed.
    AnalysisComplete,
    /// Architecture agreed.
    ArchitectureComplete,
    /// Implementation under way.
    ImplementationInProgress,
    /// Implementation finished.
    ImplementationComplete,
    /// Review finished.
    ReviewComplete,
    /// Work accepted; the next transition starts a new cycle.
    Accepted,
}

impl Stage {
    /// All stages in workflow order.
    pub const ALL: [Self; 7] = [
        Self::Init,
        Self::AnalysisComplete,
        Self::ArchitectureComplete,
        Self::ImplementationInProgress,
        Self::ImplementationComplete,
        Self::ReviewComplete,
        Self::Accepted,
    ];

    /// Returns the only stage this one may transition to.
    #[must_use]
    pub const fn successor(self) -> Self {
        match self {
            Self::Init => Self::AnalysisComplete,
            Self::AnalysisComplete => Self::ArchitectureComplete,
            Self::ArchitectureComplete => Self::ImplementationInProgress,
            Self::ImplementationInProgress => Self::ImplementationComplete,
            Self::ImplementationComplete => Self::ReviewComplete,
            Self::ReviewComplete => Self::Accepted,
            Self::Accepted => Self::Init,
        }
    }

    /// Returns the wire name, e.g. `ANALYSIS_COMPLETE`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::AnalysisComplete => "ANALYSIS_COMPLETE",
            Self::ArchitectureComplete => "ARCHITECTURE_COMPLETE",
            Self::ImplementationInProgress => "IMPLEMENTATION_IN_PROGRESS",
            Self::ImplementationComplete => "IMPLEMENTATION_COMPLETE",
            Self::ReviewComplete => "REVIEW_COMPLETE",
            Self::Accepted => "ACCEPTED",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

/// Workflow mode, independent of the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Lightweight workflow.
    #[default]
    Quick,
    /// Full workflow.
    Standard,
}

impl Mode {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Standard => "standard",
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(Self::Quick),
            "standard" => Ok(Self::Standard),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

/// The persisted record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    /// Current stage.
    pub state: Stage,
    /// Current mode.
    #[serde(default)]
    pub mode: Mode,
    /// Stages completed in this cycle, oldest first.
    #[serde(default)]
    pub locked_stages: Vec<Stage>,
}

/// Owner of the state record for one project root.
#[derive(Debug)]
pub struct ProjectStateManager {
    path: PathBuf,
    record: StateRecord,
}

impl ProjectStateManager {
    /// Opens the state record under `root/state_dir`, creating it with
    /// defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing record cannot be read or parsed, or if
    /// the default record cannot be written.
    pub fn open(root: &Path, state_dir: &Path) -> Result<Self, StateError> {
        let path = root.join(state_dir).join(STATE_FILE);

        if !path.exists() {
            let manager = Self {
                path,
                record: StateRecord::default(),
            };
            manager.persist(&manager.record)?;
            tracing::debug!(path = %manager.path.display(), "Created project state record");
            return Ok(manager);
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| StateError::Read {
            path: path.clone(),
            source,
        })?;
        let record = serde_json::from_str(&contents).map_err(|source| StateError::Parse {
            path: path.clone(),
            source,
        })?;

        Ok(Self { path, record })
    }

    /// Returns the location of the state record.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the full record.
    #[must_use]
    pub const fn record(&self) -> &StateRecord {
        &self.record
    }

    /// Returns the current stage.
    #[must_use]
    pub const fn state(&self) -> Stage {
        self.record.state
    }

    /// Returns the current mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.record.mode
    }

    /// Returns the stages locked so far in this cycle.
    #[must_use]
    pub fn locked_stages(&self) -> &[Stage] {
        &self.record.locked_stages
    }

    /// Moves to `target` if it is the legal successor of the current stage.
    ///
    /// Returns `Ok(false)` and changes nothing when the transition is not
    /// legal.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated record cannot be written; the
    /// in-memory state is then left unchanged.
    pub fn transition(&mut self, target: Stage) -> Result<bool, StateError> {
        let current = self.record.state;
        if target != current.successor() {
            tracing::debug!(from = %current, to = %target, "Rejected illegal transition");
            return Ok(false);
        }

        let mut next = self.record.clone();
        if current == Stage::Accepted {
            next.locked_stages.clear();
        } else {
            next.locked_stages.push(current);
        }
        next.state = target;

        self.persist(&next)?;
        self.record = next;
        tracing::info!(from = %current, to = %target, "Project stage advanced");
        Ok(true)
    }

    /// Sets the workflow mode and persists it immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated record cannot be written.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), StateError> {
        let next = StateRecord {
            mode,
            ..self.record.clone()
        };
        self.persist(&next)?;
        self.record = next;
        Ok(())
    }

    /// Writes `record` to a sibling temporary file, then renames it over the
    /// record.
    fn persist(&self, record: &StateRecord) -> Result<(), StateError> {
        let write_err = |source| StateError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut json = serde_json::to_string_pretty(record)
            .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        json.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(dir: &Path) -> ProjectStateManager {
        ProjectStateManager::open(dir, Path::new(".ish")).unwrap()
    }

    #[test]
    fn fresh_root_has_defaults_and_writes_record() {
        let dir = tempfile::tempdir().unwrap();
        let manager = open(dir.path());

        assert_eq!(manager.state(), Stage::Init);
        assert_eq!(manager.mode(), Mode::Quick);
        assert!(manager.locked_stages().is_empty());
        assert!(manager.path().exists());
    }

    #[test]
    fn full_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = open(dir.path());

        assert!(manager.transition(Stage::AnalysisComplete).unwrap());
        assert_eq!(manager.locked_stages(), &[Stage::Init]);

        assert!(!manager.transition(Stage::ImplementationInProgress).unwrap());
        assert_eq!(manager.state(), Stage::AnalysisComplete);
        assert_eq!(manager.locked_stages(), &[Stage::Init]);

        assert!(manager.transition(Stage::ArchitectureComplete).unwrap());
        for stage in [
            Stage::ImplementationInProgress,
            Stage::ImplementationComplete,
            Stage::ReviewComplete,
            Stage::Accepted,
        ] {
            assert!(manager.transition(stage).unwrap(), "transition to {stage}");
        }
        assert_eq!(manager.locked_stages().len(), 6);

        assert!(manager.transition(Stage::Init).unwrap());
        assert_eq!(manager.state(), Stage::Init);
        assert!(manager.locked_stages().is_empty());
    }

    #[test]
    fn self_transition_is_illegal() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = open(dir.path());
        assert!(!manager.transition(Stage::Init).unwrap());
        assert!(manager.locked_stages().is_empty());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut manager = open(dir.path());
            manager.transition(Stage::AnalysisComplete).unwrap();
            manager.set_mode(Mode::Standard).unwrap();
        }

        let reopened = open(dir.path());
        assert_eq!(reopened.state(), Stage::AnalysisComplete);
        assert_eq!(reopened.mode(), Mode::Standard);
        assert_eq!(reopened.locked_stages(), &[Stage::Init]);
    }

    #[test]
    fn record_format_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = open(dir.path());
        manager.transition(Stage::AnalysisComplete).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(manager.path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "state": "ANALYSIS_COMPLETE",
                "mode": "quick",
                "lockedStages": ["INIT"]
            })
        );
    }

    #[test]
    fn corrupt_record_is_an_error_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join(".ish");
        std::fs::create_dir_all(&state_dir).unwrap();
        std::fs::write(state_dir.join(STATE_FILE), "{\"state\": \"SHIPPED\"}").unwrap();

        let err = ProjectStateManager::open(dir.path(), Path::new(".ish")).unwrap_err();
        assert!(matches!(err, StateError::Parse { .. }));
        assert!(state_dir.join(STATE_FILE).exists());
    }

    #[test]
    fn stage_names_round_trip_through_from_str() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("DONE".parse::<Stage>().is_err());
    }

    #[test]
    fn every_stage_has_a_distinct_successor() {
        let successors: std::collections::HashSet<_> =
            Stage::ALL.iter().map(|s| s.successor()).collect();
        assert_eq!(successors.len(), Stage::ALL.len());
    }
}

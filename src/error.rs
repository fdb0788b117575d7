//! Error types for ish-mcp.
//!
//! Every error that can reach the dispatch boundary is converted into an
//! envelope there; nothing in this module terminates the server loop.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while confining a path to the project sandbox.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// The path resolves outside the project root and every allowed path.
    ///
    /// The message does not include the offending path.
    #[error("access denied: path is outside the allowed directories")]
    OutsideAllowedPaths,

    /// The path (or its parent directory) could not be resolved.
    #[error("failed to resolve path: {path}")]
    Unresolvable {
        /// Path that could not be canonicalised.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the persisted project state record.
#[derive(Error, Debug)]
pub enum StateError {
    /// The state record exists but could not be read.
    #[error("failed to read project state: {path}")]
    Read {
        /// Path to the state record.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The state record could not be written.
    #[error("failed to write project state: {path}")]
    Write {
        /// Path to the state record.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The state record is not valid JSON or names an unknown stage.
    #[error("failed to parse project state: {path}")]
    Parse {
        /// Path to the state record.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by tool implementations.
///
/// The router surfaces these as internal errors carrying only the display
/// message.
#[derive(Error, Debug)]
pub enum ToolError {
    /// A parameter passed schema validation but is semantically unusable.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Description of what's wrong.
        message: String,
    },

    /// A path argument escaped the sandbox.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// The project state record could not be loaded or saved.
    #[error(transparent)]
    State(#[from] StateError),

    /// An external command could not be started.
    #[error("failed to run command '{program}'")]
    CommandSpawn {
        /// Program that failed to start.
        program: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An external command exited unsuccessfully.
    #[error("command '{program}' exited with status {status}: {stderr}")]
    CommandFailed {
        /// Program that was run.
        program: String,
        /// Exit code, or -1 when terminated by a signal.
        status: i32,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// Filesystem access failed.
    #[error("I/O error on {path}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while reading a resource.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The resource resolves outside the sandbox.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// The resource file could not be read.
    #[error("failed to read resource: {path}")]
    Io {
        /// Path to the resource file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised when binding arguments to a prompt template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// One or more required arguments were not supplied.
    #[error("missing required prompt arguments: {}", .names.join(", "))]
    MissingArguments {
        /// Names of the missing arguments, in declaration order.
        names: Vec<String>,
    },
}

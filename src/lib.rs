//! ish-mcp: line-oriented JSON tool server for AI-assisted project workflows
//!
//! This library exposes a project's tools, documentation and prompts to an AI
//! agent over a newline-delimited JSON protocol on stdin/stdout.
//!
//! # Architecture
//!
//! - **Tools**: hand-written tools plus tools generated from configured
//!   external commands. A hand-written tool always wins a name clash.
//! - **Resources**: built-in workflow documents, documentation and templates
//!   scanned from the project.
//! - **Prompts**: built-in and file-based templates with `{{argument}}`
//!   placeholders.
//! - **Lifecycle**: a persisted, strictly sequential stage machine.
//!
//! All file access is confined to the project root and configured allowed
//! paths.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — Protocol, transport, schema validation, routing and the server
//! - [`project`] — Sandbox and lifecycle state
//! - [`providers`] — Resource and prompt providers
//! - [`tools`] — Built-in tools

pub mod config;
pub mod error;
pub mod mcp;
pub mod project;
pub mod providers;
pub mod tools;

//! ish-mcp: line-oriented JSON tool server for AI-assisted project workflows
//!
//! This tool exposes a project's lifecycle, feature packs, documentation and
//! prompts to AI agents over stdin/stdout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use ish_mcp::config;
use ish_mcp::mcp::{Server, StdioTransport};
use ish_mcp::project::ProjectContext;

/// Line-oriented JSON tool server for AI-assisted project workflows.
///
/// Reads one JSON request per line on stdin and writes one JSON envelope per
/// line on stdout. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "ish-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Project root (overrides `project_root` from the configuration)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Stdout carries the protocol, so logs always go to stderr.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns the startup licence notice printed to stderr.
fn license_notice() -> String {
    format!(
        "ish-mcp {}  Copyright (C) 2026  The Embedded Society\n\
         This program comes with ABSOLUTELY NO WARRANTY.\n\
         This is free software, licensed under GPL-3.0-or-later.\n\
         Source: {}",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_REPOSITORY"),
    )
}

/// Entry point for the ish-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nExpected config at: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!("{}", license_notice());
    eprintln!();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting ish-mcp server");

    let root = args.root.unwrap_or_else(|| cfg.project_root.clone());
    let project = match ProjectContext::new(&root, &cfg.allowed_paths) {
        Ok(project) => project,
        Err(e) => {
            error!(root = %root.display(), error = %e, "Invalid project root");
            return ExitCode::FAILURE;
        }
    };

    info!(root = %project.root().display(), "Project root resolved");

    let server = match Server::from_config(&cfg, project) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Failed to configure server");
            return ExitCode::FAILURE;
        }
    };

    info!(tools = server.router().len(), "Server ready, waiting for requests");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        let mut transport = StdioTransport::stdio();
        server.run_until_shutdown(&mut transport).await
    });

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn license_notice_names_licence_and_source() {
        let notice = license_notice();
        assert!(notice.starts_with(&format!("ish-mcp {}", env!("CARGO_PKG_VERSION"))));
        assert!(notice.contains("ABSOLUTELY NO WARRANTY"));
        assert!(notice.contains("GPL-3.0-or-later"));
        assert!(notice.contains(&format!("Source: {}", env!("CARGO_PKG_REPOSITORY"))));
    }

    #[test]
    fn log_level_precedence() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "DEBUG"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "loud"), Level::WARN);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
    }
}

//! Interactive compute-notebook server
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │               NOTEBOOK SERVER                 │
//!                      │                                               │
//!   Browser ───────────┼─▶ net::binder ─▶ http::server ─▶ handlers     │
//!                      │   (port search)   (axum, TLS)     │           │
//!                      │                                   ▼           │
//!                      │        kernels    notebooks    clusters       │
//!                      │                                               │
//!   SIGINT/SIGTERM ────┼─▶ lifecycle::signals ─▶ event loop ─▶ teardown│
//!                      │        │  ▲                                   │
//!                      │        ▼  │ ReactorHandle                     │
//!                      │   confirm prompt (thread, 5s)                 │
//!                      └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::process::ExitCode;

use notebook_server::config::{load_config, validation::validate_config, Cli, ServerConfig};
use notebook_server::lifecycle::StopReason;
use notebook_server::observability::logging;
use notebook_server::NotebookServer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };
    let config = cli.apply(file_config);
    if let Err(errors) = validate_config(&config) {
        for error in errors {
            eprintln!("Invalid configuration: {error}");
        }
        return ExitCode::FAILURE;
    }

    logging::init(&config.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "notebook-server starting");

    let server = match NotebookServer::initialize(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let reason = server.start().await;
    tracing::info!(%reason, "Shutdown complete");
    if is_clean_exit(reason) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Only a shutdown the operator asked for counts as clean.
fn is_clean_exit(reason: StopReason) -> bool {
    match reason {
        StopReason::ServerExited => false,
        StopReason::Confirmed
        | StopReason::Interrupted
        | StopReason::Terminated
        | StopReason::Requested => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_failure_is_not_a_clean_exit() {
        assert!(!is_clean_exit(StopReason::ServerExited));
        assert!(is_clean_exit(StopReason::Confirmed));
        assert!(is_clean_exit(StopReason::Interrupted));
        assert!(is_clean_exit(StopReason::Terminated));
    }
}

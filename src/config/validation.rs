//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port, retry budget)
//! - Check the kernel command can locate its connection file
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use crate::config::schema::{ServerConfig, CONNECTION_FILE_PLACEHOLDER};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("server.port must be non-zero")]
    ZeroPort,
    #[error("server.port_retries must be at least 1")]
    NoPortRetries,
    #[error("server.base_url must start with '/', got {0:?}")]
    BaseUrl(String),
    #[error("kernels.command must not be empty")]
    EmptyKernelCommand,
    #[error("kernels.command must contain the {{connection_file}} placeholder")]
    MissingConnectionPlaceholder,
    #[error("log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    if config.server.port_retries == 0 {
        errors.push(ValidationError::NoPortRetries);
    }
    if !config.server.base_url.starts_with('/') {
        errors.push(ValidationError::BaseUrl(config.server.base_url.clone()));
    }
    if config.kernels.command.is_empty() {
        errors.push(ValidationError::EmptyKernelCommand);
    } else if !config
        .kernels
        .command
        .iter()
        .any(|arg| arg.contains(CONNECTION_FILE_PLACEHOLDER))
    {
        errors.push(ValidationError::MissingConnectionPlaceholder);
    }
    if !matches!(
        config.log_level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::LogLevel(config.log_level.clone()));
    }

    if config.server.keyfile.is_some() && config.server.certfile.is_none() {
        tracing::warn!("server.keyfile is set without server.certfile and will be ignored");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

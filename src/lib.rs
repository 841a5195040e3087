//! Interactive compute-notebook server library

// Core subsystems
pub mod config;
pub mod http;
pub mod net;

// Owned collaborators
pub mod clusters;
pub mod kernels;
pub mod notebooks;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use lifecycle::{NotebookServer, StartupError};

//! Kernel lifecycle subsystem.
//!
//! The orchestrator only needs the narrow [`KernelRegistry`] view: which
//! kernels are running, and a way to stop one.

pub mod manager;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use manager::{KernelError, KernelHandle, KernelManager};

/// Unique identifier for a kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KernelId(String);

impl KernelId {
    /// Generate a new random kernel ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for KernelId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for KernelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for KernelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Running-kernel view used during shutdown.
pub trait KernelRegistry: Send + Sync {
    /// Refuse new kernels. Returns once in-flight starts are registered.
    fn close(&self) {}

    /// Ids of kernels running right now.
    fn list_running_ids(&self) -> Vec<KernelId>;

    /// Stop a kernel. Unknown or already-stopped ids are ignored.
    fn stop(&self, kernel_id: &KernelId);
}

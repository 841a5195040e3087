//! Shutdown coordination for the notebook server.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::kernels::KernelRegistry;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Stop every running kernel. Returns how many stop requests were issued.
///
/// The registry is closed first so nothing starts after the snapshot. The id
/// set is copied before iterating because stopping a kernel mutates the
/// registry.
pub fn cleanup_kernels(registry: &dyn KernelRegistry) -> usize {
    tracing::info!("Shutting down kernels");
    registry.close();
    let kernel_ids = registry.list_running_ids();
    for kernel_id in &kernel_ids {
        registry.stop(kernel_id);
    }
    kernel_ids.len()
}

/// Runs kernel cleanup when dropped, unless [`TeardownGuard::finish`] already did.
///
/// Held across the event loop so cleanup also happens while unwinding.
pub struct TeardownGuard {
    registry: Arc<dyn KernelRegistry>,
    done: bool,
}

impl TeardownGuard {
    pub fn new(registry: Arc<dyn KernelRegistry>) -> Self {
        Self {
            registry,
            done: false,
        }
    }

    /// Run cleanup now.
    pub fn finish(mut self) -> usize {
        self.done = true;
        cleanup_kernels(self.registry.as_ref())
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if !self.done {
            tracing::warn!("Event loop exited abnormally, cleaning up kernels");
            cleanup_kernels(self.registry.as_ref());
        }
    }
}

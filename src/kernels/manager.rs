//! Kernel process management.
//!
//! # Responsibilities
//! - Launch kernel processes with a per-kernel connection file
//! - Track running kernels and the notebook each one serves
//! - Stop kernels idempotently, releasing their connection files
//! - Refuse new kernels once shutdown has begun

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError, RwLock};

use crate::config::schema::{KernelConfig, CONNECTION_FILE_PLACEHOLDER};
use crate::kernels::{KernelId, KernelRegistry};
use crate::notebooks::NotebookId;

/// Error type for kernel operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("failed to prepare connection directory {path:?}: {source}")]
    ConnectionDir { path: PathBuf, source: io::Error },
    #[error("failed to write connection file {path:?}: {source}")]
    ConnectionFile { path: PathBuf, source: io::Error },
    #[error("failed to launch kernel {program:?}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("kernel command is empty")]
    EmptyCommand,
    #[error("server is shutting down")]
    ShuttingDown,
}

/// Contents of a kernel connection file.
#[derive(Debug, Serialize)]
struct ConnectionInfo<'a> {
    kernel_id: &'a KernelId,
    notebook_id: Option<&'a NotebookId>,
    transport: &'static str,
    ip: &'static str,
}

/// A running kernel process.
#[derive(Debug)]
pub struct KernelHandle {
    child: Mutex<Child>,
    connection_file: PathBuf,
    notebook_id: Option<NotebookId>,
}

impl KernelHandle {
    pub fn connection_file(&self) -> &Path {
        &self.connection_file
    }

    pub fn notebook_id(&self) -> Option<&NotebookId> {
        self.notebook_id.as_ref()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.lock().ok().map(|child| child.id())
    }

    fn terminate(&self) {
        let Ok(mut child) = self.child.lock() else {
            return;
        };
        // Already-exited children report InvalidInput on kill.
        if let Err(e) = child.kill() {
            if e.kind() != io::ErrorKind::InvalidInput {
                tracing::warn!(error = %e, "Failed to kill kernel process");
            }
        }
        if let Err(e) = child.wait() {
            tracing::warn!(error = %e, "Failed to reap kernel process");
        }
    }
}

/// Owns every kernel process started by the server.
#[derive(Debug)]
pub struct KernelManager {
    kernels: DashMap<KernelId, KernelHandle>,
    notebook_kernels: DashMap<NotebookId, KernelId>,
    connection_dir: PathBuf,
    command: Vec<String>,
    /// `false` once closed. Starts hold the read side for their whole run.
    accepting: RwLock<bool>,
}

impl KernelManager {
    pub fn new(config: &KernelConfig) -> Self {
        Self {
            kernels: DashMap::new(),
            notebook_kernels: DashMap::new(),
            connection_dir: config.connection_dir.clone(),
            command: config.command.clone(),
            accepting: RwLock::new(true),
        }
    }

    /// Stop accepting new kernels.
    ///
    /// Blocks until every start already in progress has registered its kernel,
    /// so a snapshot taken afterwards sees all of them.
    pub fn close(&self) {
        let mut accepting = self.accepting.write().unwrap_or_else(PoisonError::into_inner);
        if *accepting {
            *accepting = false;
            tracing::info!("Kernel manager closed to new kernels");
        }
    }

    pub fn is_closed(&self) -> bool {
        !*self.accepting.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a kernel, reusing the one already serving `notebook_id`.
    pub fn start_kernel(&self, notebook_id: Option<NotebookId>) -> Result<KernelId, KernelError> {
        let accepting = self.accepting.read().unwrap_or_else(PoisonError::into_inner);
        if !*accepting {
            return Err(KernelError::ShuttingDown);
        }

        let Some(notebook_id) = notebook_id else {
            return self.launch(None);
        };

        // The entry keeps the notebook's shard locked until the mapping is stored.
        match self.notebook_kernels.entry(notebook_id) {
            Entry::Occupied(entry) => {
                let existing = entry.get().clone();
                tracing::info!(kernel_id = %existing, "Using existing kernel");
                Ok(existing)
            }
            Entry::Vacant(entry) => {
                let kernel_id = self.launch(Some(entry.key().clone()))?;
                entry.insert(kernel_id.clone());
                Ok(kernel_id)
            }
        }
    }

    fn launch(&self, notebook_id: Option<NotebookId>) -> Result<KernelId, KernelError> {
        let kernel_id = KernelId::new();
        let connection_file = self.write_connection_file(&kernel_id, notebook_id.as_ref())?;

        let child = match self.spawn(&connection_file) {
            Ok(child) => child,
            Err(e) => {
                let _ = fs::remove_file(&connection_file);
                return Err(e);
            }
        };

        tracing::info!(kernel_id = %kernel_id, pid = child.id(), "Kernel started");
        self.kernels.insert(
            kernel_id.clone(),
            KernelHandle {
                child: Mutex::new(child),
                connection_file,
                notebook_id,
            },
        );
        Ok(kernel_id)
    }

    /// Kill a kernel and remove its connection file.
    ///
    /// Returns `false` when the id was not running.
    pub fn kill_kernel(&self, kernel_id: &KernelId) -> bool {
        let Some((_, handle)) = self.kernels.remove(kernel_id) else {
            tracing::debug!(kernel_id = %kernel_id, "Kernel already stopped");
            return false;
        };

        handle.terminate();
        if let Err(e) = fs::remove_file(&handle.connection_file) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    kernel_id = %kernel_id,
                    path = ?handle.connection_file,
                    error = %e,
                    "Failed to remove connection file"
                );
            }
        }
        if let Some(nb) = &handle.notebook_id {
            self.notebook_kernels.remove_if(nb, |_, kid| kid == kernel_id);
        }

        tracing::info!(kernel_id = %kernel_id, "Kernel stopped");
        true
    }

    /// Ids of every running kernel, sorted for stable output.
    pub fn list_kernel_ids(&self) -> Vec<KernelId> {
        let mut ids: Vec<KernelId> = self.kernels.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn kernel_for_notebook(&self, notebook_id: &NotebookId) -> Option<KernelId> {
        self.notebook_kernels.get(notebook_id).map(|e| e.value().clone())
    }

    pub fn connection_file(&self, kernel_id: &KernelId) -> Option<PathBuf> {
        self.kernels
            .get(kernel_id)
            .map(|h| h.connection_file().to_path_buf())
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    fn write_connection_file(
        &self,
        kernel_id: &KernelId,
        notebook_id: Option<&NotebookId>,
    ) -> Result<PathBuf, KernelError> {
        fs::create_dir_all(&self.connection_dir).map_err(|source| KernelError::ConnectionDir {
            path: self.connection_dir.clone(),
            source,
        })?;

        let path = self.connection_dir.join(format!("kernel-{kernel_id}.json"));
        let info = ConnectionInfo {
            kernel_id,
            notebook_id,
            transport: "tcp",
            ip: "127.0.0.1",
        };
        let body = serde_json::to_vec_pretty(&info).map_err(|e| KernelError::ConnectionFile {
            path: path.clone(),
            source: e.into(),
        })?;
        fs::write(&path, body).map_err(|source| KernelError::ConnectionFile {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    fn spawn(&self, connection_file: &Path) -> Result<Child, KernelError> {
        let connection_file = connection_file.to_string_lossy();
        let mut args = self
            .command
            .iter()
            .map(|arg| arg.replace(CONNECTION_FILE_PLACEHOLDER, &connection_file));
        let program = args.next().ok_or(KernelError::EmptyCommand)?;

        Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| KernelError::Spawn { program, source })
    }
}

impl KernelRegistry for KernelManager {
    fn close(&self) {
        KernelManager::close(self);
    }

    fn list_running_ids(&self) -> Vec<KernelId> {
        self.list_kernel_ids()
    }

    fn stop(&self, kernel_id: &KernelId) {
        self.kill_kernel(kernel_id);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn manager(dir: &Path) -> KernelManager {
        KernelManager::new(&KernelConfig {
            connection_dir: dir.join("security"),
            command: vec![
                "sh".into(),
                "-c".into(),
                "sleep 30".into(),
                CONNECTION_FILE_PLACEHOLDER.into(),
            ],
        })
    }

    #[test]
    fn start_writes_connection_file_and_kill_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let km = manager(dir.path());

        let id = km.start_kernel(None).unwrap();
        let file = km.connection_file(&id).unwrap();
        assert!(file.exists());
        let info: serde_json::Value = serde_json::from_slice(&fs::read(&file).unwrap()).unwrap();
        assert_eq!(info["kernel_id"], id.to_string());

        assert!(km.kill_kernel(&id));
        assert!(!file.exists());
        assert!(km.is_empty());
    }

    #[test]
    fn stopping_unknown_kernel_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let km = manager(dir.path());
        let id = km.start_kernel(None).unwrap();

        km.stop(&id);
        km.stop(&id);
        km.stop(&KernelId::new());
        assert!(km.list_running_ids().is_empty());
    }

    #[test]
    fn notebook_reuses_its_kernel() {
        let dir = tempfile::tempdir().unwrap();
        let km = manager(dir.path());
        let nb = NotebookId::new();

        let first = km.start_kernel(Some(nb.clone())).unwrap();
        let second = km.start_kernel(Some(nb.clone())).unwrap();
        assert_eq!(first, second);
        assert_eq!(km.len(), 1);

        km.kill_kernel(&first);
        assert_eq!(km.kernel_for_notebook(&nb), None);
    }

    #[test]
    fn spawn_failure_cleans_up_connection_file() {
        let dir = tempfile::tempdir().unwrap();
        let km = KernelManager::new(&KernelConfig {
            connection_dir: dir.path().to_path_buf(),
            command: vec!["/nonexistent/kernel".into(), CONNECTION_FILE_PLACEHOLDER.into()],
        });

        let err = km.start_kernel(None).unwrap_err();
        assert!(matches!(err, KernelError::Spawn { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn closed_manager_refuses_new_kernels() {
        let dir = tempfile::tempdir().unwrap();
        let km = manager(dir.path());

        km.close();
        assert!(km.is_closed());
        let err = km.start_kernel(None).unwrap_err();
        assert!(matches!(err, KernelError::ShuttingDown));
        assert!(km.is_empty());
        assert!(!dir.path().join("security").exists());
    }

    #[test]
    fn close_then_snapshot_catches_concurrent_starts() {
        let dir = tempfile::tempdir().unwrap();
        let km = Arc::new(manager(dir.path()));

        let starters: Vec<_> = (0..8)
            .map(|_| {
                let km = Arc::clone(&km);
                thread::spawn(move || {
                    let mut started = 0;
                    while km.start_kernel(None).is_ok() {
                        started += 1;
                    }
                    started
                })
            })
            .collect();

        while km.is_empty() {
            thread::yield_now();
        }
        km.close();
        for id in km.list_running_ids() {
            km.stop(&id);
        }
        assert!(km.is_empty());

        let started: usize = starters.into_iter().map(|t| t.join().unwrap()).sum();
        assert!(started > 0);
        assert!(km.is_empty());
        assert_eq!(fs::read_dir(dir.path().join("security")).unwrap().count(), 0);
    }

    #[test]
    fn concurrent_starts_for_one_notebook_share_a_kernel() {
        let dir = tempfile::tempdir().unwrap();
        let km = Arc::new(manager(dir.path()));
        let nb = NotebookId::new();

        let ids: Vec<KernelId> = (0..8)
            .map(|_| {
                let km = Arc::clone(&km);
                let nb = nb.clone();
                thread::spawn(move || km.start_kernel(Some(nb)).unwrap())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|t| t.join().unwrap())
            .collect();

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(km.len(), 1);
        assert_eq!(km.kernel_for_notebook(&nb), Some(ids[0].clone()));

        km.kill_kernel(&ids[0]);
    }
}

//! Notebook document index.
//!
//! # Responsibilities
//! - Scan the notebook directory for `.ipynb` documents at startup
//! - Assign each document a stable id for the lifetime of the process
//! - Answer listing and lookup queries from the HTTP layer

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::config::NotebookConfig;

/// File extension of notebook documents.
pub const NOTEBOOK_EXTENSION: &str = "ipynb";

/// Unique identifier for a notebook document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotebookId(String);

impl NotebookId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for NotebookId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for NotebookId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for NotebookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error type for notebook storage.
#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    #[error("notebook directory {0:?} does not exist")]
    MissingDir(PathBuf),
    #[error("notebook directory {0:?} is not a directory")]
    NotADir(PathBuf),
    #[error("failed to scan {path:?}: {source}")]
    Scan { path: PathBuf, source: io::Error },
}

/// One entry of the notebook listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotebookEntry {
    pub notebook_id: NotebookId,
    pub name: String,
}

#[derive(Debug, Default)]
struct Index {
    by_name: HashMap<String, NotebookId>,
    by_id: HashMap<NotebookId, String>,
}

/// In-memory index over the notebook directory.
#[derive(Debug)]
pub struct NotebookManager {
    notebook_dir: PathBuf,
    index: RwLock<Index>,
}

impl NotebookManager {
    pub fn new(config: &NotebookConfig) -> Self {
        Self {
            notebook_dir: config.notebook_dir.clone(),
            index: RwLock::new(Index::default()),
        }
    }

    pub fn notebook_dir(&self) -> &PathBuf {
        &self.notebook_dir
    }

    /// Scan storage and rebuild the index. Returns the number of documents.
    ///
    /// Documents seen before keep their ids.
    pub fn reconcile_on_startup(&self) -> Result<usize, NotebookError> {
        let dir = &self.notebook_dir;
        if !dir.exists() {
            return Err(NotebookError::MissingDir(dir.clone()));
        }
        if !dir.is_dir() {
            return Err(NotebookError::NotADir(dir.clone()));
        }

        let scan_err = |source| NotebookError::Scan {
            path: dir.clone(),
            source,
        };
        let mut names = Vec::new();
        for entry in fs::read_dir(dir).map_err(scan_err)? {
            let path = entry.map_err(scan_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(NOTEBOOK_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        let mut fresh = Index::default();
        for name in names {
            let id = index
                .by_name
                .get(&name)
                .cloned()
                .unwrap_or_else(NotebookId::new);
            fresh.by_id.insert(id.clone(), name.clone());
            fresh.by_name.insert(name, id);
        }
        *index = fresh;

        let count = index.by_id.len();
        tracing::info!(dir = ?dir, notebooks = count, "Notebook index rebuilt");
        Ok(count)
    }

    /// All known notebooks sorted by name.
    pub fn list_notebooks(&self) -> Vec<NotebookEntry> {
        let index = self.index.read().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<NotebookEntry> = index
            .by_name
            .iter()
            .map(|(name, id)| NotebookEntry {
                notebook_id: id.clone(),
                name: name.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn get_name(&self, notebook_id: &NotebookId) -> Option<String> {
        let index = self.index.read().unwrap_or_else(|e| e.into_inner());
        index.by_id.get(notebook_id).cloned()
    }

    pub fn contains(&self, notebook_id: &NotebookId) -> bool {
        self.get_name(notebook_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_for(dir: &std::path::Path) -> NotebookManager {
        NotebookManager::new(&NotebookConfig {
            notebook_dir: dir.to_path_buf(),
        })
    }

    #[test]
    fn indexes_only_notebook_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.ipynb"), "{}").unwrap();
        fs::write(dir.path().join("a.ipynb"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let nm = manager_for(dir.path());
        assert_eq!(nm.reconcile_on_startup().unwrap(), 2);

        let names: Vec<String> = nm.list_notebooks().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn rescanning_keeps_ids() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ipynb"), "{}").unwrap();
        let nm = manager_for(dir.path());
        nm.reconcile_on_startup().unwrap();
        let id = nm.list_notebooks()[0].notebook_id.clone();

        fs::write(dir.path().join("c.ipynb"), "{}").unwrap();
        nm.reconcile_on_startup().unwrap();

        assert_eq!(nm.get_name(&id).as_deref(), Some("a"));
        assert_eq!(nm.list_notebooks().len(), 2);
    }

    #[test]
    fn missing_directory_fails_reconcile() {
        let dir = tempfile::tempdir().unwrap();
        let nm = manager_for(&dir.path().join("absent"));
        assert!(matches!(
            nm.reconcile_on_startup(),
            Err(NotebookError::MissingDir(_))
        ));
    }
}

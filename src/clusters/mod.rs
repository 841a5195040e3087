//! Compute-cluster profile discovery.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::config::ClusterConfig;

/// Directory prefix marking a cluster profile.
const PROFILE_PREFIX: &str = "profile_";

/// Error type for profile discovery.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("failed to read profile directory {path:?}: {source}")]
    Scan { path: PathBuf, source: io::Error },
}

/// Cluster state reported for a profile. This server never starts clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStatus {
    Stopped,
}

/// A discovered cluster profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterProfile {
    pub profile: String,
    pub profile_dir: PathBuf,
    pub status: ClusterStatus,
}

/// Tracks the cluster profiles available on this machine.
#[derive(Debug)]
pub struct ClusterManager {
    profile_dir: PathBuf,
    profiles: RwLock<BTreeMap<String, ClusterProfile>>,
}

impl ClusterManager {
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            profile_dir: config.profile_dir.clone(),
            profiles: RwLock::new(BTreeMap::new()),
        }
    }

    /// Rediscover profiles, replacing the previous set.
    ///
    /// A missing profile directory simply yields no profiles.
    pub fn refresh_profiles(&self) -> Result<usize, ClusterError> {
        let mut found = Vec::new();
        match fs::read_dir(&self.profile_dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry.map_err(|source| ClusterError::Scan {
                        path: self.profile_dir.clone(),
                        source,
                    })?;
                    let path = entry.path();
                    if !path.is_dir() {
                        continue;
                    }
                    let name = entry.file_name();
                    let profile = name.to_str().and_then(|n| n.strip_prefix(PROFILE_PREFIX));
                    if let Some(profile) = profile {
                        if !profile.is_empty() {
                            found.push((profile.to_string(), path));
                        }
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(dir = ?self.profile_dir, "No profile directory");
            }
            Err(source) => {
                return Err(ClusterError::Scan {
                    path: self.profile_dir.clone(),
                    source,
                })
            }
        }

        let fresh: BTreeMap<String, ClusterProfile> = found
            .into_iter()
            .map(|(profile, profile_dir)| {
                let info = ClusterProfile {
                    profile: profile.clone(),
                    profile_dir,
                    status: ClusterStatus::Stopped,
                };
                (profile, info)
            })
            .collect();

        let mut profiles = self.profiles.write().unwrap_or_else(|e| e.into_inner());
        *profiles = fresh;

        tracing::info!(profiles = profiles.len(), "Cluster profiles refreshed");
        Ok(profiles.len())
    }

    /// All profiles sorted by name.
    pub fn list_profiles(&self) -> Vec<ClusterProfile> {
        let profiles = self.profiles.read().unwrap_or_else(|e| e.into_inner());
        profiles.values().cloned().collect()
    }

    pub fn profile_info(&self, profile: &str) -> Option<ClusterProfile> {
        let profiles = self.profiles.read().unwrap_or_else(|e| e.into_inner());
        profiles.get(profile).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_profile_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("profile_default")).unwrap();
        fs::create_dir(dir.path().join("profile_mpi")).unwrap();
        fs::create_dir(dir.path().join("extensions")).unwrap();
        fs::write(dir.path().join("profile_file"), "").unwrap();

        let cm = ClusterManager::new(&ClusterConfig {
            profile_dir: dir.path().to_path_buf(),
        });
        assert_eq!(cm.refresh_profiles().unwrap(), 2);

        let names: Vec<String> = cm.list_profiles().into_iter().map(|p| p.profile).collect();
        assert_eq!(names, vec!["default", "mpi"]);
        assert_eq!(
            cm.profile_info("mpi").map(|p| p.status),
            Some(ClusterStatus::Stopped)
        );
        assert_eq!(cm.profile_info("extensions"), None);
    }

    #[test]
    fn missing_profile_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cm = ClusterManager::new(&ClusterConfig {
            profile_dir: dir.path().join("absent"),
        });
        assert_eq!(cm.refresh_profiles().unwrap(), 0);
    }

    #[test]
    fn refresh_drops_vanished_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("profile_old");
        fs::create_dir(&gone).unwrap();
        let cm = ClusterManager::new(&ClusterConfig {
            profile_dir: dir.path().to_path_buf(),
        });
        assert_eq!(cm.refresh_profiles().unwrap(), 1);

        fs::remove_dir(&gone).unwrap();
        assert_eq!(cm.refresh_profiles().unwrap(), 0);
        assert_eq!(cm.profile_info("old"), None);

        let json = serde_json::to_value(ClusterStatus::Stopped).unwrap();
        assert_eq!(json, "stopped");
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the notebook
//! server. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder in the kernel command replaced by the connection file path.
pub const CONNECTION_FILE_PLACEHOLDER: &str = "{connection_file}";

/// Default listening address when none is configured.
pub const LOCALHOST: &str = "127.0.0.1";

/// Root configuration for the notebook server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener and access settings.
    pub server: ListenConfig,

    /// Notebook document storage.
    pub notebooks: NotebookConfig,

    /// Kernel process management.
    pub kernels: KernelConfig,

    /// Cluster profile discovery.
    pub clusters: ClusterConfig,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ListenConfig::default(),
            notebooks: NotebookConfig::default(),
            kernels: KernelConfig::default(),
            clusters: ClusterConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Whether a TLS certificate has been configured.
    pub fn tls_enabled(&self) -> bool {
        self.server.certfile.is_some()
    }

    /// URL scheme used for the reachable address.
    pub fn scheme(&self) -> &'static str {
        if self.tls_enabled() {
            "https"
        } else {
            "http"
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenConfig {
    /// IP address to listen on. `"*"` or `""` means all interfaces.
    pub ip: String,

    /// Preferred listening port.
    pub port: u16,

    /// Random ports tried after the preferred run is exhausted.
    pub port_retries: u16,

    /// Base URL prefix for every route.
    pub base_url: String,

    /// Path to an SSL/TLS certificate file (PEM).
    pub certfile: Option<PathBuf>,

    /// Path to the private key (PEM). Ignored without `certfile`.
    pub keyfile: Option<PathBuf>,

    /// Hashed password for web authentication.
    pub password: Option<String>,

    /// Prevent editing and execution of notebooks.
    pub read_only: bool,

    /// Open a web browser once the server is listening.
    pub open_browser: bool,

    /// Browser program to use instead of the system default.
    pub browser: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            ip: LOCALHOST.to_string(),
            port: 8888,
            port_retries: 50,
            base_url: "/".to_string(),
            certfile: None,
            keyfile: None,
            password: None,
            read_only: false,
            open_browser: true,
            browser: None,
        }
    }
}

impl ListenConfig {
    /// Whether the configured address means "every interface".
    pub fn binds_all_interfaces(&self) -> bool {
        matches!(self.ip.trim(), "" | "*" | "0.0.0.0" | "::")
    }

    /// Address handed to the socket layer.
    ///
    /// `::` stays the IPv6 wildcard; the other wildcards bind IPv4.
    pub fn bind_host(&self) -> &str {
        match self.ip.trim() {
            "::" => "::",
            "" | "*" | "0.0.0.0" => "0.0.0.0",
            ip => ip,
        }
    }

    /// Whether a non-empty password is configured.
    pub fn has_password(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Notebook storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotebookConfig {
    /// Directory scanned for `.ipynb` documents.
    pub notebook_dir: PathBuf,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            notebook_dir: PathBuf::from("."),
        }
    }
}

/// Kernel process configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Directory holding kernel connection files.
    pub connection_dir: PathBuf,

    /// Kernel launch command. One argument must contain `{connection_file}`.
    pub command: Vec<String>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            connection_dir: std::env::temp_dir().join("notebook-server").join("security"),
            command: vec![
                "python".to_string(),
                "-m".to_string(),
                "ipykernel_launcher".to_string(),
                "-f".to_string(),
                CONNECTION_FILE_PLACEHOLDER.to_string(),
            ],
        }
    }
}

/// Cluster profile configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Directory scanned for `profile_<name>` directories.
    pub profile_dir: PathBuf,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            profile_dir: PathBuf::from(".ipython"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_hosts_bind_everything() {
        let mut listen = ListenConfig::default();
        assert!(!listen.binds_all_interfaces());
        assert_eq!(listen.bind_host(), "127.0.0.1");

        for ip in ["*", "", "0.0.0.0"] {
            listen.ip = ip.to_string();
            assert!(listen.binds_all_interfaces(), "{ip:?}");
            assert_eq!(listen.bind_host(), "0.0.0.0");
        }

        listen.ip = "::".into();
        assert!(listen.binds_all_interfaces());
        assert_eq!(listen.bind_host(), "::");

        listen.ip = "::1".into();
        assert!(!listen.binds_all_interfaces());
        assert_eq!(listen.bind_host(), "::1");
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: ServerConfig = toml::from_str("[server]\nport = 9999\n").unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.port_retries, 50);
        assert_eq!(config.server.base_url, "/");
        assert_eq!(config.scheme(), "http");
        assert!(config.kernels.command.iter().any(|a| a.contains(CONNECTION_FILE_PLACEHOLDER)));
    }

    #[test]
    fn empty_password_is_no_password() {
        let mut listen = ListenConfig::default();
        assert!(!listen.has_password());
        listen.password = Some(String::new());
        assert!(!listen.has_password());
        listen.password = Some("sha1:abc:def".into());
        assert!(listen.has_password());
    }
}

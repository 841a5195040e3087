//! Command-line overrides layered over the config file.

use clap::Parser;
use std::path::PathBuf;

use crate::config::schema::ServerConfig;

#[derive(Debug, Default, Parser)]
#[command(name = "notebook-server")]
#[command(about = "Interactive compute notebook server", long_about = None)]
#[command(after_help = "Examples:
  notebook-server                        # start the notebook
  notebook-server --certfile=mycert.pem  # use SSL/TLS certificate
  notebook-server --port=5555 --ip='*'   # listen on port 5555, all interfaces")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// The IP address the notebook server will listen on ('*' for all).
    #[arg(long)]
    pub ip: Option<String>,

    /// The port the notebook server will listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Random ports to try when the preferred ones are taken.
    #[arg(long)]
    pub port_retries: Option<u16>,

    /// The full path to an SSL/TLS certificate file.
    #[arg(long)]
    pub certfile: Option<PathBuf>,

    /// The full path to a private key file for usage with SSL/TLS.
    #[arg(long)]
    pub keyfile: Option<PathBuf>,

    /// Directory holding notebook documents.
    #[arg(long)]
    pub notebook_dir: Option<PathBuf>,

    /// Command used to open a web browser.
    #[arg(long)]
    pub browser: Option<String>,

    /// Don't open the notebook in a browser after startup.
    #[arg(long)]
    pub no_browser: bool,

    /// Allow read-only access to notebooks.
    #[arg(long)]
    pub read_only: bool,

    /// The base URL for the notebook server.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Merge explicit flags into `config`; flags win over the file.
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if let Some(ip) = &self.ip {
            config.server.ip = ip.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(retries) = self.port_retries {
            config.server.port_retries = retries;
        }
        if let Some(certfile) = &self.certfile {
            config.server.certfile = Some(certfile.clone());
        }
        if let Some(keyfile) = &self.keyfile {
            config.server.keyfile = Some(keyfile.clone());
        }
        if let Some(dir) = &self.notebook_dir {
            config.notebooks.notebook_dir = dir.clone();
        }
        if let Some(browser) = &self.browser {
            config.server.browser = Some(browser.clone());
        }
        if self.no_browser {
            config.server.open_browser = false;
        }
        if self.read_only {
            config.server.read_only = true;
        }
        if let Some(base_url) = &self.base_url {
            config.server.base_url = base_url.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config
    }
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Install signal handlers before the listener exists
//! - Bind the listener and warn about insecure exposure
//! - Run the event loop and tear down kernels however it exits
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, and nothing is left listening
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use axum_server::tls_rustls::RustlsConfig;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::clusters::{ClusterError, ClusterManager};
use crate::config::{ListenConfig, ServerConfig};
use crate::http::{self, AppState};
use crate::kernels::{KernelManager, KernelRegistry};
use crate::lifecycle::browser::spawn_browser;
use crate::lifecycle::prompt::{ConfirmPrompt, TerminalPrompt};
use crate::lifecycle::reactor::{EventLoop, ReactorHandle, StopReason};
use crate::lifecycle::shutdown::{Shutdown, TeardownGuard};
use crate::lifecycle::signals::{install_os_signals, SignalEvent};
use crate::net::{self, BindError, BoundListener, TlsError, TlsParams};
use crate::notebooks::{NotebookError, NotebookManager};

/// Message logged when serving without encryption or authentication.
pub const EXPOSURE_WARNING: &str = "WARNING: the notebook server is listening on all IP addresses \
    but not using any encryption or authentication. This is highly insecure and not recommended.";

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("notebook manager failed to reconcile: {0}")]
    Notebooks(#[from] NotebookError),
    #[error("cluster manager failed to refresh profiles: {0}")]
    Clusters(#[from] ClusterError),
    #[error("failed to install signal handlers: {0}")]
    Signals(std::io::Error),
    #[error(transparent)]
    Tls(#[from] TlsError),
    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Whether serving `config` exposes an unprotected server to the network.
///
/// True when there is no TLS, every interface is bound, and either no
/// password is set or read-only mode is off.
pub fn is_exposed(config: &ListenConfig) -> bool {
    TlsParams::from_config(config).is_none()
        && config.binds_all_interfaces()
        && (!config.has_password() || !config.read_only)
}

/// Injection points for signal delivery and confirmation.
pub struct LifecycleHooks {
    /// Signal source; `None` installs the OS handlers.
    pub signals: Option<mpsc::UnboundedReceiver<SignalEvent>>,
    /// Confirmation prompt for the first interrupt.
    pub prompt: Arc<dyn ConfirmPrompt>,
}

impl Default for LifecycleHooks {
    fn default() -> Self {
        Self {
            signals: None,
            prompt: Arc::new(TerminalPrompt::default()),
        }
    }
}

/// The notebook server process: owned subsystems, listener and event loop.
pub struct NotebookServer {
    config: Arc<ServerConfig>,
    kernels: Arc<KernelManager>,
    notebooks: Arc<NotebookManager>,
    clusters: Arc<ClusterManager>,
    listener: BoundListener,
    tls: Option<RustlsConfig>,
    exposed: bool,
    event_loop: EventLoop,
    reactor: ReactorHandle,
}

impl NotebookServer {
    /// Initialize with OS signal handlers and the terminal prompt.
    pub async fn initialize(config: ServerConfig) -> Result<Self, StartupError> {
        Self::initialize_with(config, LifecycleHooks::default()).await
    }

    /// Initialize with explicit signal and prompt hooks.
    pub async fn initialize_with(
        config: ServerConfig,
        hooks: LifecycleHooks,
    ) -> Result<Self, StartupError> {
        let config = Arc::new(config);

        let kernels = Arc::new(KernelManager::new(&config.kernels));
        let notebooks = Arc::new(NotebookManager::new(&config.notebooks));
        let clusters = Arc::new(ClusterManager::new(&config.clusters));

        notebooks.reconcile_on_startup()?;
        clusters.refresh_profiles()?;

        let signals = match hooks.signals {
            Some(signals) => signals,
            None => install_os_signals().map_err(StartupError::Signals)?,
        };
        let (event_loop, reactor) = EventLoop::new(signals, hooks.prompt);

        let tls = match TlsParams::from_config(&config.server) {
            Some(params) => Some(net::load_tls_config(&params).await?),
            None => None,
        };

        let listener = net::acquire(
            config.server.port,
            config.server.bind_host(),
            config.server.port_retries,
        )?;

        let exposed = is_exposed(&config.server);
        if exposed {
            tracing::error!(port = listener.port(), "{}", EXPOSURE_WARNING);
        }

        Ok(Self {
            config,
            kernels,
            notebooks,
            clusters,
            listener,
            tls,
            exposed,
            event_loop,
            reactor,
        })
    }

    /// The port the listener is bound to.
    pub fn port(&self) -> u16 {
        self.listener.port()
    }

    /// The externally reachable URL.
    pub fn url(&self) -> String {
        http::display_url(&self.config, self.port())
    }

    /// Whether the insecure-exposure warning was raised.
    pub fn exposure_warning(&self) -> Option<&'static str> {
        self.exposed.then_some(EXPOSURE_WARNING)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn kernels(&self) -> Arc<KernelManager> {
        Arc::clone(&self.kernels)
    }

    /// Handle for scheduling work onto the event loop.
    pub fn reactor(&self) -> ReactorHandle {
        self.reactor.clone()
    }

    /// Serve and run the event loop until stopped, then tear down.
    pub async fn start(self) -> StopReason {
        let Self {
            config,
            kernels,
            notebooks,
            clusters,
            listener,
            tls,
            mut event_loop,
            reactor,
            ..
        } = self;

        let port = listener.port();
        tracing::info!(
            "The notebook server is running at: {}",
            http::display_url(&config, port)
        );
        tracing::info!("Use Control-C to stop this server and shut down all kernels.");

        let registry: Arc<dyn KernelRegistry> = kernels.clone();
        let teardown = TeardownGuard::new(registry);

        let shutdown = Shutdown::new();
        let router = http::build_router(AppState {
            config: Arc::clone(&config),
            kernels,
            notebooks,
            clusters,
        });
        let server_shutdown = shutdown.subscribe();
        let server_reactor = reactor.clone();
        let server = tokio::spawn(async move {
            if let Err(e) = http::serve(router, listener, tls, server_shutdown).await {
                tracing::error!(error = %e, "HTTP server failed");
            }
            server_reactor.stop(StopReason::ServerExited);
        });

        if config.server.open_browser {
            spawn_browser(http::browser_url(&config, port), config.server.browser.clone());
        }

        let reason = event_loop.run().await;
        tracing::info!(%reason, "Event loop stopped");

        shutdown.trigger();
        if let Err(e) = server.await {
            tracing::error!(error = %e, "HTTP server task failed");
        }

        let stopped = teardown.finish();
        tracing::info!(kernels = stopped, "Kernels shut down");
        reason
    }
}

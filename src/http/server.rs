//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers under the base URL
//! - Wire up middleware (tracing)
//! - Serve on the bound listener, with or without TLS
//! - Stop when the shutdown broadcast fires

use axum::{
    routing::{delete, get},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::clusters::ClusterManager;
use crate::config::ServerConfig;
use crate::http::handlers::*;
use crate::http::url::mount_point;
use crate::kernels::KernelManager;
use crate::net::BoundListener;
use crate::notebooks::NotebookManager;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub kernels: Arc<KernelManager>,
    pub notebooks: Arc<NotebookManager>,
    pub clusters: Arc<ClusterManager>,
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let base_url = state.config.server.base_url.clone();
    let api = Router::new()
        .route("/api/status", get(get_status))
        .route("/notebooks", get(list_notebooks))
        .route("/kernels", get(list_kernels).post(start_kernel))
        .route("/kernels/{kernel_id}", delete(kill_kernel))
        .route("/clusters", get(list_clusters))
        .route("/clusters/{profile}", get(get_cluster))
        .with_state(state);

    let router = match mount_point(&base_url) {
        Some(prefix) => Router::new().nest(&prefix, api),
        None => api,
    };
    router.layer(TraceLayer::new_for_http())
}

/// Serve `router` on `listener` until `shutdown` fires.
pub async fn serve(
    router: Router,
    listener: BoundListener,
    tls: Option<RustlsConfig>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let port = listener.port();
    let listener = listener.into_std()?;

    let handle = Handle::new();
    let stopper = handle.clone();
    tokio::spawn(async move {
        let _ = shutdown.recv().await;
        tracing::info!("HTTP server stopping");
        stopper.shutdown();
    });

    tracing::info!(port, tls = tls.is_some(), "HTTP server starting");
    let app = router.into_make_service();
    match tls {
        Some(tls) => {
            axum_server::from_tcp_rustls(listener, tls)
                .handle(handle)
                .serve(app)
                .await?
        }
        None => axum_server::from_tcp(listener).handle(handle).serve(app).await?,
    }

    tracing::info!("HTTP server stopped");
    Ok(())
}

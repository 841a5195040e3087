//! Request handlers for the notebook API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::clusters::ClusterProfile;
use crate::http::server::AppState;
use crate::kernels::{KernelError, KernelId};
use crate::notebooks::{NotebookEntry, NotebookId};

#[derive(Serialize)]
pub struct ServerStatus {
    pub version: &'static str,
    pub read_only: bool,
    pub kernels: usize,
    pub notebooks: usize,
}

#[derive(Debug, Deserialize)]
pub struct StartKernelParams {
    pub notebook: Option<String>,
}

#[derive(Serialize)]
pub struct KernelStarted {
    pub kernel_id: KernelId,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

pub async fn get_status(State(state): State<AppState>) -> Json<ServerStatus> {
    Json(ServerStatus {
        version: env!("CARGO_PKG_VERSION"),
        read_only: state.config.server.read_only,
        kernels: state.kernels.len(),
        notebooks: state.notebooks.list_notebooks().len(),
    })
}

pub async fn list_notebooks(State(state): State<AppState>) -> Json<Vec<NotebookEntry>> {
    Json(state.notebooks.list_notebooks())
}

pub async fn list_kernels(State(state): State<AppState>) -> Json<Vec<KernelId>> {
    Json(state.kernels.list_kernel_ids())
}

pub async fn start_kernel(
    State(state): State<AppState>,
    Query(params): Query<StartKernelParams>,
) -> Response {
    if state.config.server.read_only {
        return error(StatusCode::FORBIDDEN, "server is read-only");
    }

    let notebook_id = params.notebook.as_deref().map(NotebookId::from);
    if let Some(nb) = &notebook_id {
        if !state.notebooks.contains(nb) {
            return error(StatusCode::NOT_FOUND, format!("no notebook {nb}"));
        }
    }

    let kernels = state.kernels.clone();
    match tokio::task::spawn_blocking(move || kernels.start_kernel(notebook_id)).await {
        Ok(Ok(kernel_id)) => {
            (StatusCode::CREATED, Json(KernelStarted { kernel_id })).into_response()
        }
        Ok(Err(e @ KernelError::ShuttingDown)) => {
            error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to start kernel");
            error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn kill_kernel(
    State(state): State<AppState>,
    Path(kernel_id): Path<String>,
) -> Response {
    if state.config.server.read_only {
        return error(StatusCode::FORBIDDEN, "server is read-only");
    }

    let kernel_id = KernelId::from(kernel_id.as_str());
    let kernels = state.kernels.clone();
    match tokio::task::spawn_blocking(move || kernels.kill_kernel(&kernel_id)).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error(StatusCode::NOT_FOUND, "no such kernel"),
        Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn list_clusters(State(state): State<AppState>) -> Json<Vec<ClusterProfile>> {
    Json(state.clusters.list_profiles())
}

pub async fn get_cluster(
    State(state): State<AppState>,
    Path(profile): Path<String>,
) -> Response {
    match state.clusters.profile_info(&profile) {
        Some(info) => Json(info).into_response(),
        None => error(StatusCode::NOT_FOUND, format!("no profile {profile}")),
    }
}

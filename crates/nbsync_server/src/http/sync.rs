//! Sync, template and defaults routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use nbsync_core::{IncomingNotebook, SyncResult};
use serde::{Deserialize, Serialize};

use super::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Base64 of a whole SQLite store.
    pub db: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub notebook_count: u64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub db: String,
    pub notebook_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateResponse {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsResponse {
    pub notebooks: Vec<IncomingNotebook>,
}

/// Merges a client store into the server store.
pub async fn upload(
    State(state): State<AppState>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> AppResult<Json<UploadResponse>> {
    let Json(request) = payload?;
    let store = state.store.clone();
    let summary = run_blocking(move || store.upload_envelope(&request.db)).await?;
    Ok(Json(UploadResponse {
        status: "success".to_string(),
        notebook_count: summary.notebook_count,
        warnings: summary.warnings,
    }))
}

pub async fn download(State(state): State<AppState>) -> AppResult<Json<DownloadResponse>> {
    let store = state.store.clone();
    let snapshot = run_blocking(move || store.download_snapshot()).await?;
    Ok(Json(DownloadResponse {
        db: snapshot.to_envelope(),
        notebook_count: snapshot.notebook_count,
    }))
}

pub async fn template(State(state): State<AppState>) -> AppResult<Json<TemplateResponse>> {
    let store = state.store.clone();
    let code = run_blocking(move || store.template_code()).await?;
    Ok(Json(TemplateResponse { code }))
}

/// Every stored notebook, for client initialization.
pub async fn defaults(State(state): State<AppState>) -> AppResult<Json<DefaultsResponse>> {
    let store = state.store.clone();
    let notebooks = run_blocking(move || store.list()).await?;
    Ok(Json(DefaultsResponse {
        notebooks: notebooks.into_iter().map(IncomingNotebook::from).collect(),
    }))
}

/// Runs a store operation on the blocking pool.
pub(crate) async fn run_blocking<T, F>(op: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> SyncResult<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(op)
        .await
        .map_err(|err| AppError::internal(format!("Sync failed: worker task failed: {err}")))?;
    Ok(result?)
}

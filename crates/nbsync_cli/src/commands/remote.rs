use crate::commands::local::print_warnings;
use anyhow::{bail, Context, Result};
use nbsync_core::{
    decode_envelope, IncomingFilter, IncomingNotebook, ReconcileOptions, SeedMode, SeedNotebook,
    SyncService,
};
use reqwest::blocking::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Serialize)]
struct UploadRequest {
    db: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    notebook_count: u64,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Deserialize)]
struct DownloadResponse {
    db: String,
    notebook_count: u64,
}

#[derive(Deserialize)]
struct DefaultsResponse {
    notebooks: Vec<IncomingNotebook>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

pub fn run_push(store: &SyncService, server: &str) -> Result<()> {
    let envelope = store.download_snapshot()?.to_envelope();
    let response = Client::new()
        .post(endpoint(server, "/api/sync/upload"))
        .json(&UploadRequest { db: envelope })
        .send()
        .context("upload request failed")?;
    let body: UploadResponse = parse(response)?;
    print_warnings(&body.warnings);
    println!("pushed: server now holds {} notebooks", body.notebook_count);
    Ok(())
}

pub fn run_pull(store: &SyncService, server: &str) -> Result<()> {
    let response = Client::new()
        .get(endpoint(server, "/api/sync/download"))
        .send()
        .context("download request failed")?;
    let body: DownloadResponse = parse(response)?;
    let bytes = decode_envelope(&body.db)?;
    let options = ReconcileOptions {
        filter: IncomingFilter::MarimoAppsOnly,
        ..*store.options()
    };
    let summary = store.upload_snapshot_with(&bytes, &options)?;
    print_warnings(&summary.warnings);
    println!(
        "pulled {} server notebooks: inserted={} unchanged={} total={}",
        body.notebook_count, summary.inserted, summary.unchanged, summary.notebook_count
    );
    Ok(())
}

pub fn run_defaults(store: &SyncService, server: &str, force: bool) -> Result<()> {
    let response = Client::new()
        .get(endpoint(server, "/api/notebooks/defaults"))
        .send()
        .context("defaults request failed")?;
    let body: DefaultsResponse = parse(response)?;
    let items: Vec<SeedNotebook> = body
        .notebooks
        .into_iter()
        .map(|notebook| SeedNotebook::new(notebook.name, notebook.code))
        .collect();
    let mode = if force {
        SeedMode::Always
    } else {
        SeedMode::WhenChanged
    };
    let report = store.seed(&items, mode)?;
    println!(
        "defaults: added={} updated={} unchanged={}",
        report.added, report.updated, report.unchanged
    );
    Ok(())
}

fn endpoint(server: &str, path: &str) -> String {
    format!("{}{path}", server.trim_end_matches('/'))
}

fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<ErrorBody>()
            .ok()
            .and_then(|body| body.detail)
            .unwrap_or_else(|| status.to_string());
        bail!("server returned {status}: {detail}");
    }
    response.json().context("unexpected response body")
}

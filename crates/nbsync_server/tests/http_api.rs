use std::net::{IpAddr, Ipv4Addr};

use nbsync_core::{
    decode_envelope, IncomingNotebook, SeedMode, SeedNotebook, SyncService, DEFAULT_TEMPLATE,
};
use nbsync_server::http::{
    AppError, DefaultsResponse, DownloadResponse, HealthResponse, HttpConfig, TemplateResponse,
    UploadResponse,
};
use nbsync_server::{AppState, HttpServer, Mode};
use serde_json::{json, Value};

const TEST_BODY_LIMIT: usize = 1024 * 1024;

async fn spawn_server(store: SyncService) -> (HttpServer, String) {
    spawn_server_with_limit(store, TEST_BODY_LIMIT).await
}

async fn spawn_server_with_limit(store: SyncService, limit: usize) -> (HttpServer, String) {
    let config = HttpConfig {
        port: 0,
        bind_addr: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
    };
    let state = AppState::new(store, Mode::Development);
    let server = HttpServer::spawn(&config, limit, state).await.unwrap();
    let url = format!("http://{}", server.http_addr());
    (server, url)
}

fn client_envelope(rows: &[(&str, &str)]) -> String {
    let client = SyncService::open_in_memory().unwrap();
    let batch: Vec<IncomingNotebook> = rows
        .iter()
        .map(|(name, code)| IncomingNotebook::from_code(*name, *code))
        .collect();
    client.merge_incoming(&batch).unwrap();
    client.download_snapshot().unwrap().to_envelope()
}

#[tokio::test]
async fn health_reports_mode_and_count() {
    let (server, url) = spawn_server(SyncService::open_in_memory().unwrap()).await;

    let health: HealthResponse = reqwest::get(format!("{url}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(health.mode, "development");
    assert_eq!(health.notebook_count, 0);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn upload_merges_and_reports_renames() {
    let store = SyncService::open_in_memory().unwrap();
    store
        .merge_incoming(&[IncomingNotebook::from_code("a", "codeA")])
        .unwrap();
    let (server, url) = spawn_server(store).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{url}/api/sync/upload"))
        .json(&json!({ "db": client_envelope(&[("a", "codeA2"), ("b", "codeB")]) }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: UploadResponse = response.json().await.unwrap();

    assert_eq!(body.status, "success");
    assert_eq!(body.notebook_count, 3);
    assert_eq!(body.warnings, vec!["Renamed 'a' to 'a_1'".to_string()]);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn download_returns_whole_store() {
    let store = SyncService::open_in_memory().unwrap();
    store
        .merge_incoming(&[
            IncomingNotebook::from_code("one", "1"),
            IncomingNotebook::from_code("two", "2"),
        ])
        .unwrap();
    let (server, url) = spawn_server(store).await;

    let body: DownloadResponse = reqwest::get(format!("{url}/api/sync/download"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.notebook_count, 2);

    let local = SyncService::open_in_memory().unwrap();
    let summary = local
        .upload_snapshot(&decode_envelope(&body.db).unwrap())
        .unwrap();
    assert_eq!(summary.notebook_count, 2);
    assert!(local.get("two").unwrap().is_some());
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn garbage_upload_is_a_bad_request() {
    let store = SyncService::open_in_memory().unwrap();
    store
        .merge_incoming(&[IncomingNotebook::from_code("keep", "k")])
        .unwrap();
    let (server, url) = spawn_server(store).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{url}/api/sync/upload"))
        .json(&json!({ "db": "bm90IGEgZGF0YWJhc2U=" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let error: AppError = response.json().await.unwrap();
    assert!(error.detail.unwrap().starts_with("Sync failed: "));

    let health: HealthResponse = reqwest::get(format!("{url}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.notebook_count, 1);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_body_is_rejected_as_json_error() {
    let (server, url) = spawn_server(SyncService::open_in_memory().unwrap()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{url}/api/sync/upload"))
        .json(&json!({ "database": "nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "422");
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn oversized_upload_is_refused() {
    let (server, url) = spawn_server_with_limit(SyncService::open_in_memory().unwrap(), 512).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{url}/api/sync/upload"))
        .json(&json!({ "db": "A".repeat(4096) }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 413);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn template_falls_back_then_uses_stored_row() {
    let store = SyncService::open_in_memory().unwrap();
    let (server, url) = spawn_server(store).await;

    let fallback: TemplateResponse = reqwest::get(format!("{url}/api/template"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fallback.code, DEFAULT_TEMPLATE);
    server.shutdown().await.unwrap();

    let store = SyncService::open_in_memory().unwrap();
    store
        .seed(&[SeedNotebook::new("template", "stored")], SeedMode::Always)
        .unwrap();
    let (server, url) = spawn_server(store).await;
    let stored: TemplateResponse = reqwest::get(format!("{url}/api/template"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored.code, "stored");
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn defaults_list_every_notebook() {
    let store = SyncService::open_in_memory().unwrap();
    store
        .seed(
            &[SeedNotebook::new("x", "ex"), SeedNotebook::new("y", "why")],
            SeedMode::Always,
        )
        .unwrap();
    let (server, url) = spawn_server(store).await;

    let body: DefaultsResponse = reqwest::get(format!("{url}/api/notebooks/defaults"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(
        body.notebooks,
        vec![
            IncomingNotebook::from_code("x", "ex"),
            IncomingNotebook::from_code("y", "why"),
        ]
    );
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn index_points_at_endpoints() {
    let (server, url) = spawn_server(SyncService::open_in_memory().unwrap()).await;

    let body: Value = reqwest::get(format!("{url}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["health"], "/health");
    assert_eq!(body["sync_upload"], "/api/sync/upload");
    server.shutdown().await.unwrap();
}

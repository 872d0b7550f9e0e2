//! HTTP server part of nbsync-server

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Instant,
};

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::Method,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use nbsync_core::core_version;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, task::JoinSet};
use tower_http::cors::{self, CorsLayer};

mod error;
mod sync;

use crate::state::AppState;

pub use self::error::{AppError, AppResult};
pub use self::sync::{
    DefaultsResponse, DownloadResponse, TemplateResponse, UploadRequest, UploadResponse,
};

/// Config for the HTTP server
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpConfig {
    /// Port to bind to
    pub port: u16,
    /// Optionally set a custom bind address (will use 0.0.0.0 if unset)
    pub bind_addr: Option<IpAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub mode: String,
    pub notebook_count: u64,
}

/// The HTTP server part of nbsync-server
pub struct HttpServer {
    tasks: JoinSet<std::io::Result<()>>,
    http_addr: SocketAddr,
}

impl HttpServer {
    /// Spawn the server
    pub async fn spawn(
        config: &HttpConfig,
        max_upload_bytes: usize,
        state: AppState,
    ) -> Result<HttpServer> {
        let app = create_app(state, max_upload_bytes);

        let bind_addr = SocketAddr::new(
            config.bind_addr.unwrap_or(Ipv4Addr::UNSPECIFIED.into()),
            config.port,
        );
        let listener = TcpListener::bind(bind_addr).await?;
        let http_addr = listener.local_addr()?;
        info!("event=http_listen module=http status=ok addr={http_addr}");

        let mut tasks = JoinSet::new();
        tasks.spawn(async move { axum::serve(listener, app).await });

        Ok(HttpServer { tasks, http_addr })
    }

    /// Get the bound address of the HTTP socket.
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Shutdown the server and wait for all tasks to complete.
    pub async fn shutdown(mut self) -> Result<()> {
        self.tasks.abort_all();
        self.run_until_done().await?;
        Ok(())
    }

    /// Wait for all tasks to complete.
    ///
    /// Runs forever unless tasks fail.
    pub async fn run_until_done(mut self) -> Result<()> {
        let mut final_res: anyhow::Result<()> = Ok(());
        while let Some(res) = self.tasks.join_next().await {
            match res {
                Ok(Ok(())) => {}
                Err(err) if err.is_cancelled() => {}
                Ok(Err(err)) => {
                    warn!("event=http_task module=http status=error error={err}");
                    final_res = Err(anyhow::Error::from(err));
                }
                Err(err) => {
                    warn!("event=http_task module=http status=panic error={err}");
                    final_res = Err(err.into());
                }
            }
        }
        final_res
    }
}

pub fn create_app(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(cors::Any)
        .allow_origin(cors::Any);

    Router::new()
        .route("/api/sync/upload", post(sync::upload))
        .route("/api/sync/download", get(sync::download))
        .route("/api/template", get(sync::template))
        .route("/api/notebooks/defaults", get(sync::defaults))
        .route("/health", get(health))
        .route("/", get(index))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .route_layer(middleware::from_fn(log_requests))
}

async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let store = state.store.clone();
    let notebook_count = sync::run_blocking(move || store.count()).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        mode: state.mode.to_string(),
        notebook_count,
    }))
}

async fn index() -> Json<Value> {
    Json(json!({
        "name": "nbsync-server",
        "version": core_version(),
        "health": "/health",
        "sync_upload": "/api/sync/upload",
        "sync_download": "/api/sync/download",
        "template": "/api/template",
        "defaults": "/api/notebooks/defaults",
    }))
}

/// Log one line per request.
async fn log_requests(req: Request, next: Next) -> impl IntoResponse {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;
    let status = response.status();
    let latency = start.elapsed().as_millis();
    if status.is_success() {
        info!(
            "event=http_request module=http status=ok method={method} path={path} code={} duration_ms={latency}",
            status.as_u16()
        );
    } else {
        warn!(
            "event=http_request module=http status=error method={method} path={path} code={} duration_ms={latency}",
            status.as_u16()
        );
    }
    response
}

//! HTTP front end for one server-side notebook store.
//!
//! Routes are thin: every handler hands its work to the core `SyncService`
//! on the blocking pool and maps the result to JSON.

pub mod config;
pub mod http;
pub mod server;
pub mod state;

pub use config::{Config, Mode};
pub use http::HttpServer;
pub use state::AppState;

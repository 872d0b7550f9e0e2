//! Shared state for the HTTP handlers

use crate::config::Mode;
use nbsync_core::SyncService;
use std::sync::Arc;

/// The shared app state.
#[derive(Clone)]
pub struct AppState {
    /// The server-side notebook store
    pub store: Arc<SyncService>,
    pub mode: Mode,
}

impl AppState {
    pub fn new(store: SyncService, mode: Mode) -> Self {
        Self {
            store: Arc::new(store),
            mode,
        }
    }
}

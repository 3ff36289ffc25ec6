//! Shared application state.

use std::sync::Arc;

use crate::history::HistoryStore;
use crate::relay::RelayService;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Chat submit pipeline.
    pub relay: Arc<RelayService>,
    /// History store used directly by the read and clear endpoints.
    pub store: Arc<dyn HistoryStore>,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl AppState {
    pub fn new(relay: Arc<RelayService>, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            relay,
            store,
            cors_origins: Vec::new(),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}

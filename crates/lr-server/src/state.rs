//! Application state.
//!
//! Shared state for all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::live_reload::ConnectionRegistry;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Canonical served root.
    pub(crate) root_dir: PathBuf,
    /// Index document for `/` and directory requests.
    pub(crate) index: String,
    /// Push connection registry (if live reload is enabled).
    pub(crate) live_reload: Option<Arc<ConnectionRegistry>>,
}

impl AppState {
    /// Check if live reload is enabled.
    #[must_use]
    pub(crate) fn live_reload_enabled(&self) -> bool {
        self.live_reload.is_some()
    }
}

//! Live reload system.
//!
//! Watches the served root, tracks browser push connections and tells every
//! connected page to reload when a file changes.
//!
//! ```text
//! notify ──► FsWatcher ──mpsc──► ReloadCoordinator ──► ConnectionRegistry
//!                                                          │ broadcast("reload")
//!                                                          ▼
//!                                              one queue per WebSocket client
//! ```

mod coordinator;
mod debouncer;
mod registry;
mod snippet;
mod watcher;
pub(crate) mod websocket;

pub use coordinator::ReloadCoordinator;
pub use registry::{BroadcastReport, Connection, ConnectionId, ConnectionRegistry, ReloadMessage};
pub use snippet::{RELOAD_CLIENT, inject_reload_client};
pub use watcher::{ChangeEvent, ChangeKind, FsWatcher, WatchOptions};

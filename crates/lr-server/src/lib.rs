//! Live-reloading static file server.
//!
//! Serves a directory over HTTP and refreshes every open browser tab when a
//! file under it changes. A single listening port carries both:
//! - Plain file requests, with a reload client injected into HTML documents
//! - WebSocket upgrades from that client, on any path
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use lr_server::{LiveReloadSettings, ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         host: "127.0.0.1".to_owned(),
//!         port: 3000,
//!         root_dir: PathBuf::from("public"),
//!         index: "index.html".to_owned(),
//!         live_reload: Some(LiveReloadSettings::default()),
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum fallback handler
//!                        │
//!                        ├─► WebSocket upgrade ──► ConnectionRegistry
//!                        │                              ▲ broadcast("reload")
//!                        │                              │
//!                        │        notify ──► FsWatcher ──► ReloadCoordinator
//!                        │
//!                        └─► Static file (+ reload client for HTML)
//! ```

mod app;
mod error;
mod handlers;
pub mod live_reload;
mod middleware;
mod state;
mod static_files;

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use error::{ServerError, StartError};
use live_reload::{ChangeKind, ConnectionRegistry, FsWatcher, ReloadCoordinator, WatchOptions};
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on (`0` picks a free port).
    pub port: u16,
    /// Directory to serve and watch.
    pub root_dir: PathBuf,
    /// Index document for `/` and directory requests.
    pub index: String,
    /// Live reload settings (`None` disables live reload).
    pub live_reload: Option<LiveReloadSettings>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            root_dir: PathBuf::from("public"),
            index: "index.html".to_owned(),
            live_reload: Some(LiveReloadSettings::default()),
        }
    }
}

/// Live reload settings.
#[derive(Clone, Debug)]
pub struct LiveReloadSettings {
    /// Glob patterns to watch, relative to the root. Empty watches everything.
    pub watch_patterns: Vec<String>,
    /// Change kinds that trigger a reload.
    pub reload_on: Vec<ChangeKind>,
    /// Per-path debounce window in milliseconds (`0` disables).
    pub debounce_ms: u64,
    /// Watcher event queue capacity.
    pub queue_capacity: usize,
}

impl Default for LiveReloadSettings {
    fn default() -> Self {
        Self {
            watch_patterns: Vec::new(),
            reload_on: vec![ChangeKind::Modified],
            debounce_ms: 0,
            queue_capacity: 256,
        }
    }
}

impl LiveReloadSettings {
    fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            patterns: self.watch_patterns.clone(),
            kinds: self.reload_on.clone(),
            debounce: Duration::from_millis(self.debounce_ms),
            queue_capacity: self.queue_capacity,
        }
    }
}

/// Running live reload pipeline.
struct LiveReload {
    registry: Arc<ConnectionRegistry>,
    watcher: FsWatcher,
    coordinator: JoinHandle<()>,
}

impl LiveReload {
    /// Start the watcher and the coordinator task.
    fn start(root: &std::path::Path, settings: &LiveReloadSettings) -> Result<Self, StartError> {
        let registry = Arc::new(ConnectionRegistry::new());
        let (watcher, events) = FsWatcher::start(root, settings.watch_options())?;
        let coordinator = ReloadCoordinator::new(Arc::clone(&registry)).spawn(events);
        Ok(Self {
            registry,
            watcher,
            coordinator,
        })
    }

    /// Stop watching and drop all connections. Best-effort.
    fn shutdown(self) {
        self.watcher.stop();
        self.coordinator.abort();
        self.registry.close_all();
    }
}

/// A bound, not yet running server.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    host: String,
    state: Arc<AppState>,
    live_reload: Option<LiveReload>,
}

impl Server {
    /// Bind the listening endpoint and start the live reload pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the served root is not a directory, the address
    /// cannot be bound, or the watcher fails to start.
    pub async fn bind(config: ServerConfig) -> Result<Self, StartError> {
        let root_dir = tokio::fs::canonicalize(&config.root_dir)
            .await
            .and_then(|root| {
                if root.is_dir() {
                    Ok(root)
                } else {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::NotADirectory,
                        "not a directory",
                    ))
                }
            })
            .map_err(|source| StartError::RootDir {
                path: config.root_dir.clone(),
                source,
            })?;

        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| StartError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| StartError::Bind { addr, source })?;

        let live_reload = config
            .live_reload
            .as_ref()
            .map(|settings| LiveReload::start(&root_dir, settings))
            .transpose()?;

        let state = Arc::new(AppState {
            root_dir,
            index: config.index,
            live_reload: live_reload.as_ref().map(|lr| Arc::clone(&lr.registry)),
        });

        tracing::info!(address = %local_addr, root = %state.root_dir.display(), "Server bound");

        Ok(Self {
            listener,
            local_addr,
            host: config.host,
            state,
            live_reload,
        })
    }

    /// Address actually bound.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL to open in a browser.
    #[must_use]
    pub fn url(&self) -> String {
        let host = match self.host.as_str() {
            "0.0.0.0" | "::" | "[::]" => "localhost",
            host => host,
        };
        format!("http://{host}:{}/", self.local_addr.port())
    }

    /// Registry of live reload connections, if live reload is enabled.
    #[must_use]
    pub fn registry(&self) -> Option<Arc<ConnectionRegistry>> {
        self.state.live_reload.clone()
    }

    /// Serve until `shutdown` resolves.
    ///
    /// On shutdown all push connections are closed, the listener stops
    /// accepting, and the watcher is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the server loop fails.
    pub async fn run<F>(self, shutdown: F) -> Result<(), StartError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let registry = self.state.live_reload.clone();
        let app = app::create_router(self.state);

        tracing::info!(address = %self.local_addr, "Starting server");

        let result = axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                // Push sockets never finish on their own, close them so the
                // graceful shutdown is not held up
                if let Some(registry) = registry {
                    registry.close_all();
                }
            })
            .await;

        if let Some(live_reload) = self.live_reload {
            live_reload.shutdown();
        }
        tracing::info!("Server stopped");

        result.map_err(StartError::Serve)
    }
}

/// Run the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), StartError> {
    Server::bind(config).await?.run(shutdown_signal()).await
}

/// Wait for shutdown signal (Ctrl-C).
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C, shutting down");
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from lr config.
#[must_use]
pub fn server_config_from_lr_config(config: &lr_config::Config) -> ServerConfig {
    let live_reload = config.live_reload.enabled.then(|| LiveReloadSettings {
        watch_patterns: config.live_reload.watch_patterns.clone(),
        reload_on: config
            .live_reload
            .reload_on
            .iter()
            .copied()
            .map(ChangeKind::from)
            .collect(),
        debounce_ms: config.live_reload.debounce_ms,
        queue_capacity: config.live_reload.queue_capacity,
    });

    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        root_dir: config.serve_resolved.root_dir.clone(),
        index: config.serve_resolved.index.clone(),
        live_reload,
    }
}

//! Error types for the HTTP server.

use std::path::PathBuf;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Request-level error, rendered as a plain-text HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Request path does not resolve to an existing file under the served root.
    #[error("File not found: {0}")]
    NotFound(String),

    /// File exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Resolved file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::NotFound(path) => {
                tracing::debug!(path = %path, "File not found");
                (StatusCode::NOT_FOUND, "404 Not Found")
            }
            Self::Read { path, source } => {
                tracing::warn!(path = %path.display(), error = %source, "Failed to read file");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
    }
}

/// Error raised while starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// Served root is missing or not a directory.
    #[error("Served root {} is not accessible: {source}", path.display())]
    RootDir {
        /// Configured root directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Listening endpoint could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested `host:port`.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Invalid watch pattern.
    #[error("Invalid watch pattern {pattern:?}: {source}")]
    Pattern {
        /// Pattern as configured.
        pattern: String,
        /// Glob parse error.
        source: glob::PatternError,
    },

    /// Filesystem watcher could not be started.
    #[error("Failed to start file watcher: {0}")]
    Watch(#[from] notify::Error),

    /// Server loop failed.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

//! Static file serving.
//!
//! Resolves request paths under the served root, maps file extensions to
//! content types and injects the live reload client into HTML documents.

use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use crate::error::ServerError;
use crate::live_reload::inject_reload_client;
use crate::state::AppState;

/// Content type for HTML documents, which receive the reload client.
const HTML: &str = "text/html";

/// Return the content type for a file based on its extension.
///
/// Unknown or missing extensions are served as plain text. Extensions match
/// case-insensitively, so `INDEX.HTML` is HTML too and gets the reload client.
/// `jpg` is served as the registered `image/jpeg` rather than `image/jpg`.
pub(crate) fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html") => HTML,
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "text/plain",
    }
}

/// Map a URL path onto a filesystem path under `root`.
///
/// The path is percent-decoded and normalized component by component. Returns
/// `None` when the path would escape the root (`..`, drive prefixes) or is not
/// valid UTF-8 after decoding. `/` maps to the index document.
pub(crate) fn resolve_request_path(root: &Path, index: &str, url_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(url_path).decode_utf8().ok()?;

    let mut resolved = root.to_path_buf();
    let mut depth = 0usize;
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::Normal(segment) => {
                resolved.push(segment);
                depth += 1;
            }
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }

    if depth == 0 {
        resolved.push(index);
    }
    Some(resolved)
}

/// Whether an I/O error means the path does not exist as a servable file.
///
/// Walking through a regular file (`/index.html/x`) or an over-long name fails
/// with something other than `NotFound`, but nothing is there either.
fn is_missing(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::NotFound
            | ErrorKind::NotADirectory
            | ErrorKind::IsADirectory
            | ErrorKind::InvalidFilename
    )
}

/// Resolve symlinks in `path` and require the result to stay under `root`.
///
/// `root` must already be canonical.
async fn contain(root: &Path, path: PathBuf, url_path: &str) -> Result<PathBuf, ServerError> {
    let canonical = match tokio::fs::canonicalize(&path).await {
        Ok(canonical) => canonical,
        Err(e) if is_missing(&e) => return Err(ServerError::NotFound(url_path.to_owned())),
        Err(source) => return Err(ServerError::Read { path, source }),
    };

    if canonical.starts_with(root) {
        Ok(canonical)
    } else {
        tracing::debug!(
            path = %path.display(),
            target = %canonical.display(),
            "Link points outside the served root"
        );
        Err(ServerError::NotFound(url_path.to_owned()))
    }
}

/// Serve the file behind `url_path`.
///
/// Directories are served through their index document. When `state` has
/// live reload enabled, HTML bodies get the reload client injected.
pub(crate) async fn serve_file(state: &AppState, url_path: &str) -> Result<Response, ServerError> {
    let not_found = || ServerError::NotFound(url_path.to_owned());

    let requested =
        resolve_request_path(&state.root_dir, &state.index, url_path).ok_or_else(not_found)?;
    let mut path = contain(&state.root_dir, requested, url_path).await?;

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => {
            path = contain(&state.root_dir, path.join(&state.index), url_path).await?;
        }
        Ok(_) => {}
        Err(e) if is_missing(&e) => return Err(not_found()),
        Err(source) => return Err(ServerError::Read { path, source }),
    }

    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        // Deleted since it was resolved, or an index that is itself a directory
        Err(e) if is_missing(&e) => return Err(not_found()),
        Err(source) => return Err(ServerError::Read { path, source }),
    };

    let content_type = content_type_for(&path);
    let body = if content_type == HTML && state.live_reload_enabled() {
        inject_reload_client(&content).into_owned()
    } else {
        content
    };

    tracing::debug!(path = %path.display(), content_type, bytes = body.len(), "Serving file");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        Body::from(body),
    )
        .into_response())
}

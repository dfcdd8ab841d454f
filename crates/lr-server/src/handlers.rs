//! Request handler for the shared endpoint.
//!
//! Every path accepts both plain file requests and live reload upgrades.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, Request, State};
use axum::response::{IntoResponse, Response};

use crate::live_reload::websocket;
use crate::state::AppState;
use crate::static_files;

/// Upgrade live reload clients, serve files for everything else.
///
/// A request that is not a WebSocket upgrade falls through to file serving.
pub(crate) async fn handle_request(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let (mut parts, _body) = request.into_parts();

    if let Some(registry) = &state.live_reload {
        match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
            Ok(ws) => return websocket::accept(ws, Arc::clone(registry)),
            Err(rejection) => {
                tracing::trace!(%rejection, "Not a live reload upgrade");
            }
        }
    }

    match static_files::serve_file(&state, parts.uri.path()).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

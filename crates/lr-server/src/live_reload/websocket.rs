//! WebSocket transport for live reload.
//!
//! Upgrades requests on the shared endpoint and pumps reload messages from a
//! registered [`Connection`] to the browser.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;

use super::registry::{Connection, ConnectionRegistry};

/// Complete the upgrade and register the connection once the socket is live.
pub(crate) fn accept(ws: WebSocketUpgrade, registry: Arc<ConnectionRegistry>) -> Response {
    ws.on_failed_upgrade(|error| {
        tracing::debug!(%error, "Live reload upgrade failed");
    })
    .on_upgrade(move |socket| {
        let connection = registry.accept();
        handle_socket(socket, connection)
    })
}

/// Handle an established WebSocket connection.
///
/// Runs until the client goes away, the transport errors, or the registry
/// drops the connection. The connection is removed from the registry on exit.
async fn handle_socket(mut socket: WebSocket, mut connection: Connection) {
    loop {
        tokio::select! {
            message = connection.recv() => {
                let Some(message) = message else {
                    // Registry torn down
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                };
                if let Err(error) = socket.send(Message::Text(message.as_str().into())).await {
                    tracing::debug!(connection = %connection.id(), %error, "Failed to push reload");
                    break;
                }
            }
            // Client frames carry no meaning; reading them detects close
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    connection.close();
}

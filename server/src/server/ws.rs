//! Live log streaming over WebSocket.
//!
//! One connection tails one deployment: the handler subscribes to the
//! deployment's log broker and forwards each broadcast chunk as a text
//! frame. The subscription ends when the client disconnects, the send
//! fails, or the broker shuts down.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info};
use uuid::Uuid;

use crate::server::state::ServerState;

/// WebSocket upgrade handler for a deployment's live output
pub async fn logs_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<Uuid>,
    State(state): State<Arc<ServerState>>,
) -> Response {
    ws.on_upgrade(move |socket| stream_logs(socket, state, id))
}

async fn stream_logs(socket: WebSocket, state: Arc<ServerState>, id: Uuid) {
    let (mut sender, mut receiver) = socket.split();

    let mut subscription = match state.registry.subscribe(&id).await {
        Ok(sub) => sub,
        Err(e) => {
            debug!("Log subscription rejected for {}: {}", id, e);
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    info!(
        "Observer {} attached to deployment {}",
        subscription.id, id
    );

    loop {
        tokio::select! {
            chunk = subscription.rx.recv() => {
                match chunk {
                    Some(text) => {
                        if sender.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // Broker shut down; the deployment was stopped or deleted
                    None => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    // Inbound frames are ignored; this stream is one-way
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.registry.unsubscribe(&id, subscription.id).await;
    info!(
        "Observer {} detached from deployment {}",
        subscription.id, id
    );
}

use crate::events::Event;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Forward broadcast events to one dashboard client until either side
/// disconnects. A slow client may lag the broadcast channel and lose
/// events; that is logged and the stream continues with fresh ones.
pub async fn handle_connection(
    socket: WebSocket,
    mut rx: broadcast::Receiver<Event>,
    client_id: String,
) {
    info!(client = %client_id, "dashboard client connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        let json = match serde_json::to_string(&event) {
                            Ok(json) => json,
                            Err(e) => {
                                error!(error = %e, "failed to serialize event");
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(client = %client_id, skipped, "client lagging; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Text(text))) => {
                        // The feed is one-way; inbound text is ignored.
                        debug!(client = %client_id, len = text.len(), "ignoring client message");
                    }
                    Some(Ok(_)) => {
                        // Ping/pong is answered by axum itself.
                    }
                    Some(Err(e)) => {
                        warn!(client = %client_id, error = %e, "websocket error");
                        break;
                    }
                }
            }
        }
    }

    info!(client = %client_id, "dashboard client disconnected");
}

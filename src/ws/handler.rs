use crate::api::AppState;
use crate::ws::connection::handle_connection;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tracing::info;

/// Upgrade `GET /ws/events` to a WebSocket and stream dashboard events to
/// the client. The event feed is read-only; clients do not subscribe to
/// individual streams.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let client_id = uuid::Uuid::new_v4().to_string();
    let rx = state.events.subscribe();
    info!(client = %client_id, "websocket upgrade accepted");
    ws.on_upgrade(move |socket: WebSocket| handle_connection(socket, rx, client_id))
}

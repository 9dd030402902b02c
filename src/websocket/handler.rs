use std::borrow::Cow;
use std::sync::Arc;
use axum::{
    extract::{State, ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::models::messages::{ProtocolErrorMessage, ReceivedMessage, SendMessage};
use crate::state::AppState;
use crate::websocket::msg_code_change_handler::handle_code_change_message;
use crate::websocket::msg_join_handler::handle_join_message;
use crate::websocket::msg_ping_handler::handle_ping_message;
use crate::ws::connctx::{ConnectionId, Mailbox, Outbound};
use crate::ws::coordinator::SessionCoordinator;

// Tell the coordinator the transport is gone when the socket future ends,
// including when it is dropped mid-join
struct CloseOnDrop {
    coordinator: Arc<SessionCoordinator>,
    conn: ConnectionId,
}

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.coordinator.closed(self.conn);
    }
}

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state.coordinator))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, coordinator: Arc<SessionCoordinator>) {

    // Everything for this socket, replies and room traffic alike, goes through one mailbox
    let (mailbox, mut outbox) = mpsc::unbounded_channel::<Outbound>();
    let reply = mailbox.clone();
    let conn = coordinator.connect(mailbox);
    let _close_on_drop = CloseOnDrop { coordinator: coordinator.clone(), conn };

    let (mut sender, mut receiver) = socket.split();

    // Drain the mailbox into the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(outbound) = outbox.recv().await {
            match outbound {
                Outbound::Message(msg) => {
                    let text = match serde_json::to_string(&msg) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to serialize message for {}: {}", conn, e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Outbound::Close { reason } => {
                    info!("Closing {}: {}", conn, reason);
                    let frame = CloseFrame { code: close_code::POLICY, reason: Cow::Owned(reason) };
                    _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    });

    // Read frames one at a time so a connection's events are handled in arrival order
    let reader_coordinator = coordinator.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = receiver.next().await {
            match frame {
                Message::Text(text) => handle_text(&text, &reader_coordinator, conn, &reply).await,
                Message::Close(_) => break,
                _ => continue,
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // Peers hear about the departure before the presence entry is dropped
    coordinator.disconnecting(conn);
    info!("WebSocket connection {} terminated", conn);
}

async fn handle_text(text: &str, coordinator: &SessionCoordinator, conn: ConnectionId, reply: &Mailbox) {
    let received: ReceivedMessage = match serde_json::from_str(text) {
        Ok(received) => received,
        Err(e) => {
            warn!("Failed to parse message on {}: {}", conn, e);
            let msg = SendMessage::Error(ProtocolErrorMessage { error: format!("Invalid message: {}", e) });
            _ = reply.send(Outbound::Message(msg));
            return;
        }
    };

    match received {
        ReceivedMessage::Join(join_msg) => handle_join_message(&join_msg, coordinator, conn, reply).await,
        ReceivedMessage::CodeChange(change_msg) => handle_code_change_message(&change_msg, coordinator, conn),
        ReceivedMessage::Ping(_) => handle_ping_message(conn, reply),
    }
}

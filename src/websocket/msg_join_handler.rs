use tracing::info;

use crate::models::messages::{JoinMessage, JoinResultMessage, SendMessage};
use crate::ws::connctx::{ConnectionId, Mailbox, Outbound};
use crate::ws::coordinator::SessionCoordinator;

/// Handle JoinMessage - bind the connection to the room and reply with roster and document
pub async fn handle_join_message(join_msg: &JoinMessage, coordinator: &SessionCoordinator, conn: ConnectionId, reply: &Mailbox) {
    info!("Join message received on {}: room={}, user={}", conn, join_msg.room_id, join_msg.username);

    let result = match coordinator.join(conn, &join_msg.room_id, &join_msg.username).await {
        Ok(accepted) => JoinResultMessage {
            success: true,
            clients: Some(accepted.roster),
            initial_code: Some(accepted.document_content),
            error: None,
        },
        Err(e) => JoinResultMessage {
            success: false,
            clients: None,
            initial_code: None,
            error: Some(e.to_string()),
        },
    };

    _ = reply.send(Outbound::Message(SendMessage::JoinResult(result)));
}

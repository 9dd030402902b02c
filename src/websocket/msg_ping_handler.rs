use chrono::Utc;
use tracing::debug;

use crate::models::messages::{PongMessage, SendMessage};
use crate::ws::connctx::{ConnectionId, Mailbox, Outbound};

/// Handle PingMessage - send a pong message back
pub fn handle_ping_message(conn: ConnectionId, reply: &Mailbox) {
    debug!("Ping message received on {}", conn);

    let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
    _ = reply.send(Outbound::Message(pong));
}

use tracing::debug;

use crate::models::messages::CodeChangeMessage;
use crate::ws::connctx::ConnectionId;
use crate::ws::coordinator::SessionCoordinator;

/// Handle CodeChangeMessage - relay to the room, nothing goes back to the sender.
/// Edits from connections outside the room are dropped by the router.
pub fn handle_code_change_message(change_msg: &CodeChangeMessage, coordinator: &SessionCoordinator, conn: ConnectionId) {
    if let Ok(peers) = coordinator.edit(conn, &change_msg.room_id, &change_msg.code) {
        debug!("Code change on {} for room {} sent to {} peers", conn, change_msg.room_id, peers);
    }
}

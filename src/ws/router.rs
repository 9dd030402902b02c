use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::coordinator::Sessions;
use super::connctx::{ConnState, ConnectionId};
use super::docctx::LiveDocCache;
use super::error::SessionError;
use super::userctx::UserCtxCache;
use crate::models::messages::{CodeUpdateMessage, SendMessage};
use crate::stores::DocumentStore;

#[derive(Debug)]
struct PendingEdit {
    content: String,
    editor: String,
}

/// Newest unsaved text per room. A room id sits in the worker queue at most
/// once; later edits overwrite the entry instead of queueing another copy.
#[derive(Default)]
struct PendingEdits {
    latest: Mutex<HashMap<String, PendingEdit>>,
}

impl PendingEdits {
    /// Returns true when the room was not already waiting for the worker
    fn put(&self, room_id: &str, edit: PendingEdit) -> bool {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        latest.insert(room_id.to_string(), edit).is_none()
    }

    fn take(&self, room_id: &str) -> Option<PendingEdit> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner).remove(room_id)
    }
}

/// Fans one participant's edit out to the rest of the room and hands the
/// text to the persistence worker.
///
/// Delivery happens inside the caller's critical section, so peers see edits
/// of a room in publish order. Persistence runs on a single background task
/// that saves only the newest text of each room, so a slow store holds at
/// most one pending copy per room. Its failures are logged and never reach
/// the sender.
pub struct BroadcastRouter {
    docs: Arc<LiveDocCache>,
    pending: Arc<PendingEdits>,
    jobs: mpsc::UnboundedSender<String>,
}

impl BroadcastRouter {
    /// Must be called from within a tokio runtime; spawns the persistence worker.
    pub fn new(identities: Arc<UserCtxCache>, documents: Arc<dyn DocumentStore>, docs: Arc<LiveDocCache>) -> Self {
        let (jobs, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(PendingEdits::default());
        tokio::spawn(run_persistence(rx, pending.clone(), identities, documents));
        Self { docs, pending, jobs }
    }

    /// Returns how many peers the edit was handed to.
    pub fn publish(
        &self,
        sessions: &Sessions,
        conn: ConnectionId,
        room_id: &str,
        content: &str,
    ) -> Result<usize, SessionError> {
        let joined = sessions
            .conn(conn)
            .is_some_and(|ctx| ctx.state == ConnState::Joined);
        let editor = match sessions.presence.display_name(conn) {
            Some(name) if joined && sessions.presence.room_of(conn) == Some(room_id) => name.to_string(),
            _ => {
                warn!("Dropping edit from {} for room {}: connection has not joined it", conn, room_id);
                return Err(SessionError::NotJoined(room_id.to_string()));
            }
        };

        let delivered = sessions.notify_room(
            room_id,
            Some(conn),
            SendMessage::CodeChange(CodeUpdateMessage { code: content.to_string() }),
        );
        debug!("Edit by {} in room {} relayed to {} peers", editor, room_id, delivered);

        self.docs.record(room_id, content);

        let edit = PendingEdit { content: content.to_string(), editor };
        if self.pending.put(room_id, edit) {
            if let Err(e) = self.jobs.send(room_id.to_string()) {
                error!("Persistence worker is gone, edit for room {} not saved: {}", room_id, e);
            }
        }
        Ok(delivered)
    }
}

async fn run_persistence(
    mut rx: mpsc::UnboundedReceiver<String>,
    pending: Arc<PendingEdits>,
    identities: Arc<UserCtxCache>,
    documents: Arc<dyn DocumentStore>,
) {
    info!("Document persistence worker started");
    while let Some(room_id) = rx.recv().await {
        let Some(edit) = pending.take(&room_id) else {
            continue;
        };
        if let Err(e) = persist(&room_id, &edit, &identities, documents.as_ref()).await {
            error!("Code update error for room {}: {}", room_id, e);
        }
    }
    info!("Document persistence worker stopped");
}

async fn persist(
    room_id: &str,
    edit: &PendingEdit,
    identities: &UserCtxCache,
    documents: &dyn DocumentStore,
) -> Result<(), String> {
    let identity = identities
        .resolve(&edit.editor)
        .await
        .map_err(|e| format!("identity lookup for {} failed: {}", edit.editor, e))?
        .ok_or_else(|| format!("User {} not found", edit.editor))?;

    documents
        .upsert(room_id, &edit.content, identity.id)
        .await
        .map_err(|e| format!("document upsert failed: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(content: &str) -> PendingEdit {
        PendingEdit { content: content.to_string(), editor: "alice".to_string() }
    }

    #[test]
    fn later_edits_replace_the_pending_one() {
        let pending = PendingEdits::default();

        assert!(pending.put("r1", edit("a")));
        assert!(!pending.put("r1", edit("ab")));
        assert!(pending.put("r2", edit("x")));

        assert_eq!(pending.take("r1").unwrap().content, "ab");
        assert!(pending.take("r1").is_none());
        assert!(pending.put("r1", edit("abc")));
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::messages::SendMessage;

/// Identifier the transport assigns to one live websocket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a connection as seen by the coordinator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnState {
    Unjoined,
    Joining,
    Joined,
    Disconnecting,
    Closed,
}

impl ConnState {
    pub fn is_live(self) -> bool {
        !matches!(self, ConnState::Disconnecting | ConnState::Closed)
    }
}

/// What the coordinator asks a socket writer to do
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(SendMessage),
    Close { reason: String },
}

pub type Mailbox = mpsc::UnboundedSender<Outbound>;

#[derive(Debug)]
pub struct ConnCtx {
    pub state: ConnState,
    /// Bumped on every join attempt so a suspended join can tell it was superseded
    pub join_epoch: u64,
    pub display_name: Option<String>,
    pub room_id: Option<String>,
    mailbox: Mailbox,
}

impl ConnCtx {
    pub fn new(mailbox: Mailbox) -> Self {
        Self {
            state: ConnState::Unjoined,
            join_epoch: 0,
            display_name: None,
            room_id: None,
            mailbox,
        }
    }

    /// Best-effort delivery; a gone writer just means the socket is tearing down
    pub fn send(&self, msg: SendMessage) -> bool {
        self.mailbox.send(Outbound::Message(msg)).is_ok()
    }

    pub fn close(&self, reason: &str) {
        _ = self.mailbox.send(Outbound::Close { reason: reason.to_string() });
    }
}

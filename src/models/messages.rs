use serde::{Deserialize, Serialize};

use crate::ws::connctx::ConnectionId;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CodeChangeMessage {
    pub room_id: String,
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PingMessage {}

/// One live participant of a room
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientEntry {
    pub socket_id: ConnectionId,
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinResultMessage {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<Vec<ClientEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinedMessage {
    pub clients: Vec<ClientEntry>,
    pub username: String,
    pub socket_id: ConnectionId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectedMessage {
    pub socket_id: ConnectionId,
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CodeUpdateMessage {
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProtocolErrorMessage {
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "code-change")]
    CodeChange(CodeChangeMessage),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "join-result")]
    JoinResult(JoinResultMessage),
    #[serde(rename = "joined")]
    Joined(JoinedMessage),
    #[serde(rename = "disconnected")]
    Disconnected(DisconnectedMessage),
    #[serde(rename = "code-change")]
    CodeChange(CodeUpdateMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
    #[serde(rename = "error")]
    Error(ProtocolErrorMessage),
}

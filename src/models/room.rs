use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const MAX_ROOM_NAME_LEN: usize = 50;

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user: Uuid,
    pub joined_at: DateTime<Utc>,
}

/// Room metadata held by the room directory
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub room_id: String,
    pub name: String,
    pub created_by: Uuid,
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomRecord {
    pub fn has_participant(&self, user: Uuid) -> bool {
        self.participants.iter().any(|p| p.user == user)
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CreateRoomRequest {
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CreateRoomResponse {
    pub success: bool,
    pub room: RoomSummary,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantListing {
    pub username: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomListing {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    pub participants: Vec<ParticipantListing>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct MyRoomsResponse {
    pub success: bool,
    pub rooms: Vec<RoomListing>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRoom {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants_count: Option<usize>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct JoinRoomResponse {
    pub success: bool,
    pub message: String,
    pub room: JoinedRoom,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub name: String,
    pub room_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct RoomInfoResponse {
    pub success: bool,
    pub room: RoomInfo,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct UserRoomsResponse {
    pub rooms: Vec<RoomRecord>,
}

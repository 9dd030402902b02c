use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{
    api_error, ApiError, CreateRoomRequest, CreateRoomResponse, JoinRoomResponse, JoinedRoom, MyRoomsResponse,
    ParticipantListing, RoomInfo, RoomInfoResponse, RoomListing, RoomRecord, RoomSummary, UserRoomsResponse,
    MAX_ROOM_NAME_LEN,
};
use crate::routes::auth_middleware::AuthUser;
use crate::state::AppState;
use crate::stores::StoreError;

fn store_failure(context: &str, e: StoreError) -> ApiError {
    error!("{}: {}", context, e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, context)
}

/// Create a new room owned by the caller
pub async fn create_room(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<CreateRoomResponse>), ApiError> {
    let name = request.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Room name is required"));
    }
    if name.chars().count() > MAX_ROOM_NAME_LEN {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Room name cannot exceed {} characters", MAX_ROOM_NAME_LEN),
        ));
    }

    let room_id = Uuid::new_v4().to_string();
    let room = state
        .stores
        .rooms
        .create(name, &room_id, user.id)
        .await
        .map_err(|e| store_failure("Failed to create room", e))?;

    info!("Room {} ({}) created by {}", room.name, room.room_id, user.username);
    Ok((
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            success: true,
            room: RoomSummary {
                id: room.room_id,
                name: room.name,
                created_at: room.created_at,
                created_by: room.created_by,
            },
        }),
    ))
}

/// Rooms the caller participates in, most recently updated first
pub async fn my_rooms(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MyRoomsResponse>, ApiError> {
    let records = state
        .stores
        .rooms
        .rooms_for_user(user.id)
        .await
        .map_err(|e| store_failure("Failed to fetch rooms", e))?;

    let mut rooms = Vec::with_capacity(records.len());
    for record in records {
        rooms.push(to_listing(&state, record).await?);
    }
    Ok(Json(MyRoomsResponse { success: true, rooms }))
}

async fn to_listing(state: &AppState, record: RoomRecord) -> Result<RoomListing, ApiError> {
    let identities = &state.stores.identities;
    let created_by = identities
        .get(record.created_by)
        .await
        .map_err(|e| store_failure("Failed to fetch rooms", e))?
        .map(|u| u.username)
        .unwrap_or_default();

    let mut participants = Vec::with_capacity(record.participants.len());
    for participant in &record.participants {
        let found = identities
            .get(participant.user)
            .await
            .map_err(|e| store_failure("Failed to fetch rooms", e))?;
        if let Some(identity) = found {
            participants.push(ParticipantListing {
                username: identity.username,
                joined_at: participant.joined_at,
            });
        }
    }

    Ok(RoomListing {
        id: record.room_id,
        name: record.name,
        created_at: record.created_at,
        updated_at: record.updated_at,
        created_by,
        participants,
    })
}

/// Add the caller to an existing room
pub async fn join_room(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(room_id): Path<String>,
) -> Result<Json<JoinRoomResponse>, ApiError> {
    let room = state
        .stores
        .rooms
        .get(&room_id)
        .await
        .map_err(|e| store_failure("Failed to join room", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Room not found"))?;

    if room.has_participant(user.id) {
        return Ok(Json(JoinRoomResponse {
            success: true,
            message: "Already in room".to_string(),
            room: JoinedRoom { id: room.room_id, name: room.name, participants_count: None },
        }));
    }

    match state.stores.rooms.add_member(&room_id, user.id).await {
        Ok(_) => {}
        Err(StoreError::NotFound) => return Err(api_error(StatusCode::NOT_FOUND, "Room not found")),
        Err(e) => return Err(store_failure("Failed to join room", e)),
    }

    info!("{} joined room {}", user.username, room_id);
    Ok(Json(JoinRoomResponse {
        success: true,
        message: "Joined room successfully".to_string(),
        room: JoinedRoom {
            id: room.room_id,
            name: room.name,
            participants_count: Some(room.participants.len() + 1),
        },
    }))
}

/// Public lookup used by clients to check a room exists before joining
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomInfoResponse>, ApiError> {
    let room = state
        .stores
        .rooms
        .get(&room_id)
        .await
        .map_err(|e| store_failure("Failed to fetch room details", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Room not found"))?;

    Ok(Json(RoomInfoResponse {
        success: true,
        room: RoomInfo { name: room.name, room_id: room.room_id, created_at: room.created_at },
    }))
}

/// Rooms a given user participates in
pub async fn user_rooms(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserRoomsResponse>, ApiError> {
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, format!("Invalid user id '{}'", user_id)))?;

    let rooms = state
        .stores
        .rooms
        .rooms_for_user(user_id)
        .await
        .map_err(|e| store_failure("Failed to fetch rooms", e))?;
    Ok(Json(UserRoomsResponse { rooms }))
}

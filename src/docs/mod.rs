use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Document store unreachable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = AuthResponse),
        (status = 400, description = "Invalid input or user already exists", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn register_doc() {}

/// Log in with email or username
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn login_doc() {}

/// Create a room
#[utoipa::path(
    post,
    path = "/api/rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = CreateRoomResponse),
        (status = 400, description = "Invalid room name", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_room_doc() {}

/// Rooms the caller participates in
#[utoipa::path(
    get,
    path = "/api/rooms/my-rooms",
    responses(
        (status = 200, description = "Rooms of the caller", body = MyRoomsResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn my_rooms_doc() {}

/// Join a room
#[utoipa::path(
    post,
    path = "/api/rooms/{room_id}/join",
    params(("room_id" = String, Path, description = "Room id")),
    responses(
        (status = 200, description = "Joined or already a participant", body = JoinRoomResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn join_room_doc() {}

/// Public room details
#[utoipa::path(
    get,
    path = "/api/rooms/{room_id}",
    params(("room_id" = String, Path, description = "Room id")),
    responses(
        (status = 200, description = "Room details", body = RoomInfoResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn get_room_doc() {}

/// Rooms of a user
#[utoipa::path(
    get,
    path = "/api/rooms/user/{user_id}",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Rooms of the user", body = UserRoomsResponse),
        (status = 400, description = "Malformed user id", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn user_rooms_doc() {}

/// Stored document of a room
#[utoipa::path(
    get,
    path = "/api/documents/{room_id}",
    params(("room_id" = String, Path, description = "Room id")),
    responses(
        (status = 200, description = "Document snapshot", body = DocumentSnapshot),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn get_document_doc() {}

/// Replace the content of an existing document
#[utoipa::path(
    put,
    path = "/api/documents/{room_id}",
    params(("room_id" = String, Path, description = "Room id")),
    request_body = UpdateDocumentRequest,
    responses(
        (status = 200, description = "Updated snapshot", body = DocumentSnapshot),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn put_document_doc() {}

/// Session and host diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        register_doc,
        login_doc,
        create_room_doc,
        my_rooms_doc,
        join_room_doc,
        get_room_doc,
        user_rooms_doc,
        get_document_doc,
        put_document_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            CreateRoomRequest,
            CreateRoomResponse,
            RoomSummary,
            MyRoomsResponse,
            RoomListing,
            ParticipantListing,
            JoinRoomResponse,
            JoinedRoom,
            RoomInfoResponse,
            RoomInfo,
            UserRoomsResponse,
            RoomRecord,
            Participant,
            DocumentSnapshot,
            UpdateDocumentRequest,
            DiagnosticsResponse
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;

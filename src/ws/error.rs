/// Why a session operation was refused. The `Display` text is what the
/// requesting socket sees in its `join-result`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Room ID and username are required")]
    InvalidRequest,
    #[error("User not found in database")]
    UnknownUser,
    #[error("Connection has not joined room '{0}'")]
    NotJoined(String),
    /// Carries the backend detail for logs only
    #[error("Service temporarily unavailable")]
    StoreUnavailable(String),
    #[error("Room not found")]
    RoomNotFound,
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Join superseded by a newer request")]
    Superseded,
}

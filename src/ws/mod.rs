//! Room and session coordination: presence, join/leave lifecycle and edit fan-out.

pub mod connctx;
pub mod coordinator;
pub mod docctx;
pub mod error;
pub mod presence;
pub mod router;
pub mod userctx;

pub use connctx::{ConnState, ConnectionId, Outbound};
pub use coordinator::{JoinAccepted, SessionCoordinator, SessionStats};
pub use error::SessionError;

//! Collaborator contracts the session layer talks to.
//!
//! Identity, room and document records live behind these traits so the
//! coordinator can run against the Postgres backend (`db::dbcolab`) or the
//! in-memory one used by default and in tests.

pub mod memory;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{DocumentSnapshot, Identity, RoomRecord};

pub use memory::{MemoryDocumentStore, MemoryIdentityDirectory, MemoryRoomDirectory};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Look a participant up by display name
    async fn resolve(&self, username: &str) -> StoreResult<Option<Identity>>;

    /// Look a participant up by email or username
    async fn find_by_login(&self, identity: &str) -> StoreResult<Option<Identity>>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Identity>>;

    /// Fails with `Conflict` when the username or email is taken
    async fn register(&self, username: &str, email: &str, password_hash: &str) -> StoreResult<Identity>;
}

#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn create(&self, name: &str, room_id: &str, owner: Uuid) -> StoreResult<RoomRecord>;

    /// Adds the user as participant. Returns false if already a member.
    async fn add_member(&self, room_id: &str, user: Uuid) -> StoreResult<bool>;

    async fn exists(&self, room_id: &str) -> StoreResult<bool>;

    async fn get(&self, room_id: &str) -> StoreResult<Option<RoomRecord>>;

    async fn members_of_record(&self, room_id: &str) -> StoreResult<Vec<Uuid>>;

    /// Rooms the user participates in, most recently updated first
    async fn rooms_for_user(&self, user: Uuid) -> StoreResult<Vec<RoomRecord>>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, room_id: &str) -> StoreResult<Option<DocumentSnapshot>>;

    /// Insert the document unless one exists; returns whatever is stored afterwards
    async fn create_if_absent(&self, room_id: &str, content: &str, creator: Uuid) -> StoreResult<DocumentSnapshot>;

    /// Set content, last editor and last-edited time, creating the record if absent
    async fn upsert(&self, room_id: &str, content: &str, editor: Uuid) -> StoreResult<DocumentSnapshot>;

    /// Replace the content of an existing document only
    async fn update_content(&self, room_id: &str, content: &str) -> StoreResult<Option<DocumentSnapshot>>;

    /// Cheap round trip telling whether the backend currently answers
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// The three collaborators, shared between the session layer and HTTP handlers
#[derive(Clone)]
pub struct Stores {
    pub identities: Arc<dyn IdentityDirectory>,
    pub rooms: Arc<dyn RoomDirectory>,
    pub documents: Arc<dyn DocumentStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            identities: Arc::new(MemoryIdentityDirectory::new()),
            rooms: Arc::new(MemoryRoomDirectory::new()),
            documents: Arc::new(MemoryDocumentStore::new()),
        }
    }
}

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, IdentityDirectory, RoomDirectory, StoreError, StoreResult};
use crate::models::{DocumentSnapshot, Identity, Participant, RoomRecord};

#[derive(Default)]
pub struct MemoryIdentityDirectory {
    users: RwLock<HashMap<Uuid, Identity>>,
}

impl MemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityDirectory for MemoryIdentityDirectory {
    async fn resolve(&self, username: &str) -> StoreResult<Option<Identity>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_login(&self, identity: &str) -> StoreResult<Option<Identity>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email == identity || u.username == identity)
            .cloned())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn register(&self, username: &str, email: &str, password_hash: &str) -> StoreResult<Identity> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict(format!("email '{}' already registered", email)));
        }
        if users.values().any(|u| u.username == username) {
            return Err(StoreError::Conflict(format!("username '{}' already taken", username)));
        }
        let identity = Identity {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        users.insert(identity.id, identity.clone());
        Ok(identity)
    }
}

#[derive(Default)]
pub struct MemoryRoomDirectory {
    rooms: RwLock<HashMap<String, RoomRecord>>,
}

impl MemoryRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomDirectory for MemoryRoomDirectory {
    async fn create(&self, name: &str, room_id: &str, owner: Uuid) -> StoreResult<RoomRecord> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(room_id) {
            return Err(StoreError::Conflict(format!("room '{}' already exists", room_id)));
        }
        let now = Utc::now();
        let record = RoomRecord {
            room_id: room_id.to_string(),
            name: name.to_string(),
            created_by: owner,
            participants: vec![Participant { user: owner, joined_at: now }],
            created_at: now,
            updated_at: now,
        };
        rooms.insert(room_id.to_string(), record.clone());
        Ok(record)
    }

    async fn add_member(&self, room_id: &str, user: Uuid) -> StoreResult<bool> {
        let mut rooms = self.rooms.write().await;
        let record = rooms.get_mut(room_id).ok_or(StoreError::NotFound)?;
        if record.has_participant(user) {
            return Ok(false);
        }
        let now = Utc::now();
        record.participants.push(Participant { user, joined_at: now });
        record.updated_at = now;
        Ok(true)
    }

    async fn exists(&self, room_id: &str) -> StoreResult<bool> {
        Ok(self.rooms.read().await.contains_key(room_id))
    }

    async fn get(&self, room_id: &str) -> StoreResult<Option<RoomRecord>> {
        Ok(self.rooms.read().await.get(room_id).cloned())
    }

    async fn members_of_record(&self, room_id: &str) -> StoreResult<Vec<Uuid>> {
        let rooms = self.rooms.read().await;
        let record = rooms.get(room_id).ok_or(StoreError::NotFound)?;
        Ok(record.participants.iter().map(|p| p.user).collect())
    }

    async fn rooms_for_user(&self, user: Uuid) -> StoreResult<Vec<RoomRecord>> {
        let rooms = self.rooms.read().await;
        let mut found: Vec<RoomRecord> = rooms
            .values()
            .filter(|r| r.has_participant(user))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(found)
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<String, DocumentSnapshot>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, room_id: &str) -> StoreResult<Option<DocumentSnapshot>> {
        Ok(self.docs.read().await.get(room_id).cloned())
    }

    async fn create_if_absent(&self, room_id: &str, content: &str, creator: Uuid) -> StoreResult<DocumentSnapshot> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .entry(room_id.to_string())
            .or_insert_with(|| DocumentSnapshot::new(room_id, content, creator));
        Ok(doc.clone())
    }

    async fn upsert(&self, room_id: &str, content: &str, editor: Uuid) -> StoreResult<DocumentSnapshot> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .entry(room_id.to_string())
            .or_insert_with(|| DocumentSnapshot::new(room_id, content, editor));
        doc.content = content.to_string();
        doc.last_edited_by = Some(editor);
        doc.last_edited_at = Utc::now();
        Ok(doc.clone())
    }

    async fn update_content(&self, room_id: &str, content: &str) -> StoreResult<Option<DocumentSnapshot>> {
        let mut docs = self.docs.write().await;
        Ok(docs.get_mut(room_id).map(|doc| {
            doc.content = content.to_string();
            doc.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_rejects_duplicate_username_and_email() {
        let users = MemoryIdentityDirectory::new();
        users.register("alice", "alice@example.com", "hash").await.unwrap();

        let by_email = users.register("alice2", "alice@example.com", "hash").await;
        assert!(matches!(by_email, Err(StoreError::Conflict(_))));
        let by_name = users.register("alice", "other@example.com", "hash").await;
        assert!(matches!(by_name, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn login_lookup_accepts_email_or_username() {
        let users = MemoryIdentityDirectory::new();
        let alice = users.register("alice", "alice@example.com", "hash").await.unwrap();

        assert_eq!(users.find_by_login("alice").await.unwrap().unwrap().id, alice.id);
        assert_eq!(users.find_by_login("alice@example.com").await.unwrap().unwrap().id, alice.id);
        assert!(users.resolve("alice@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn add_member_is_idempotent() {
        let rooms = MemoryRoomDirectory::new();
        let owner = Uuid::new_v4();
        let guest = Uuid::new_v4();
        rooms.create("Pairing", "r1", owner).await.unwrap();

        assert!(rooms.add_member("r1", guest).await.unwrap());
        assert!(!rooms.add_member("r1", guest).await.unwrap());
        assert_eq!(rooms.members_of_record("r1").await.unwrap(), vec![owner, guest]);
        assert!(matches!(rooms.add_member("missing", guest).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn create_if_absent_keeps_existing_content() {
        let docs = MemoryDocumentStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        docs.upsert("r1", "print(1)", alice).await.unwrap();

        let doc = docs.create_if_absent("r1", "seed", bob).await.unwrap();
        assert_eq!(doc.content, "print(1)");
        assert_eq!(doc.created_by, alice);
    }

    #[tokio::test]
    async fn upsert_records_last_editor() {
        let docs = MemoryDocumentStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        docs.create_if_absent("r1", "seed", alice).await.unwrap();

        let doc = docs.upsert("r1", "edited", bob).await.unwrap();
        assert_eq!(doc.content, "edited");
        assert_eq!(doc.created_by, alice);
        assert_eq!(doc.last_edited_by, Some(bob));
    }

    #[tokio::test]
    async fn update_content_does_not_create() {
        let docs = MemoryDocumentStore::new();
        assert!(docs.update_content("r1", "x").await.unwrap().is_none());
        assert!(docs.get("r1").await.unwrap().is_none());
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::models::{DocumentSnapshot, Identity, Participant, RoomRecord};
use crate::stores::{DocumentStore, IdentityDirectory, RoomDirectory, StoreError, StoreResult};

/// Tables the service needs. Applied at startup, safe to run repeatedly.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS rooms (
    room_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_by UUID NOT NULL REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS room_participants (
    room_id TEXT NOT NULL REFERENCES rooms(room_id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id),
    joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (room_id, user_id)
);

CREATE INDEX IF NOT EXISTS room_participants_user_idx ON room_participants (user_id);

CREATE TABLE IF NOT EXISTS documents (
    room_id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    created_by UUID NOT NULL,
    last_edited_by UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_edited_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
}

impl From<UserRow> for Identity {
    fn from(row: UserRow) -> Self {
        Identity {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct RoomRow {
    room_id: String,
    name: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ParticipantRow {
    room_id: String,
    user_id: Uuid,
    joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct DocumentRow {
    room_id: String,
    content: String,
    created_by: Uuid,
    last_edited_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    last_edited_at: DateTime<Utc>,
}

impl From<DocumentRow> for DocumentSnapshot {
    fn from(row: DocumentRow) -> Self {
        DocumentSnapshot {
            room_id: row.room_id,
            content: row.content,
            created_by: row.created_by,
            last_edited_by: row.last_edited_by,
            created_at: row.created_at,
            last_edited_at: row.last_edited_at,
        }
    }
}

const DOCUMENT_COLUMNS: &str = "room_id, content, created_by, last_edited_by, created_at, last_edited_at";

/// Postgres-backed identity directory, room directory and document store
pub struct DbColab {
    pool: PgPool,
}

impl DbColab {
    /// Create a new database connection pool and make sure the schema exists
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // Close idle connections after 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // Recycle connections after 30 minutes
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!("Database schema is up to date");

        Ok(Self { pool })
    }

    fn log_pool_state(&self, operation: &str) {
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        debug!(
            "{}. Pool connections: {} idle, {} in use",
            operation,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Postgres>, SqlxError> {
        match self.pool.begin().await {
            Ok(tx) => Ok(tx),
            Err(e) => {
                error!(
                    "Failed to acquire connection from pool: {}. Pool state: {} idle, {} total",
                    e,
                    self.pool.num_idle(),
                    self.pool.size()
                );
                Err(e)
            }
        }
    }

    /// Attach participants (in join order) to the given room rows
    async fn with_participants(&self, rows: Vec<RoomRow>) -> StoreResult<Vec<RoomRecord>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = rows.iter().map(|r| r.room_id.clone()).collect();
        let participants = sqlx::query_as::<_, ParticipantRow>(
            "SELECT room_id, user_id, joined_at FROM room_participants WHERE room_id = ANY($1) ORDER BY joined_at",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_room: HashMap<String, Vec<Participant>> = HashMap::new();
        for p in participants {
            by_room
                .entry(p.room_id)
                .or_default()
                .push(Participant { user: p.user_id, joined_at: p.joined_at });
        }

        Ok(rows
            .into_iter()
            .map(|row| RoomRecord {
                participants: by_room.remove(&row.room_id).unwrap_or_default(),
                room_id: row.room_id,
                name: row.name,
                created_by: row.created_by,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }
}

#[async_trait]
impl IdentityDirectory for DbColab {
    async fn resolve(&self, username: &str) -> StoreResult<Option<Identity>> {
        self.log_pool_state(&format!("Resolving user {}", username));
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    async fn find_by_login(&self, identity: &str) -> StoreResult<Option<Identity>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash FROM users WHERE email = $1 OR username = $1 LIMIT 1",
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, username, email, password_hash FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Identity::from))
    }

    async fn register(&self, username: &str, email: &str, password_hash: &str) -> StoreResult<Identity> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        info!("Registered user {}", row.username);
        Ok(row.into())
    }
}

#[async_trait]
impl RoomDirectory for DbColab {
    async fn create(&self, name: &str, room_id: &str, owner: Uuid) -> StoreResult<RoomRecord> {
        let mut tx = self.begin().await?;

        let room = sqlx::query_as::<_, RoomRow>(
            r#"
            INSERT INTO rooms (room_id, name, created_by)
            VALUES ($1, $2, $3)
            RETURNING room_id, name, created_by, created_at, updated_at
            "#,
        )
        .bind(room_id)
        .bind(name)
        .bind(owner)
        .fetch_one(&mut *tx)
        .await?;

        let creator = sqlx::query_as::<_, ParticipantRow>(
            r#"
            INSERT INTO room_participants (room_id, user_id, joined_at)
            VALUES ($1, $2, $3)
            RETURNING room_id, user_id, joined_at
            "#,
        )
        .bind(room_id)
        .bind(owner)
        .bind(room.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RoomRecord {
            room_id: room.room_id,
            name: room.name,
            created_by: room.created_by,
            participants: vec![Participant { user: creator.user_id, joined_at: creator.joined_at }],
            created_at: room.created_at,
            updated_at: room.updated_at,
        })
    }

    async fn add_member(&self, room_id: &str, user: Uuid) -> StoreResult<bool> {
        let mut tx = self.begin().await?;

        let found = sqlx::query_scalar::<_, String>("SELECT room_id FROM rooms WHERE room_id = $1 FOR UPDATE")
            .bind(room_id)
            .fetch_optional(&mut *tx)
            .await?;
        if found.is_none() {
            return Err(StoreError::NotFound);
        }

        let inserted = sqlx::query(
            "INSERT INTO room_participants (room_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(room_id)
        .bind(user)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query("UPDATE rooms SET updated_at = NOW() WHERE room_id = $1")
                .bind(room_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn exists(&self, room_id: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM rooms WHERE room_id = $1)")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn get(&self, room_id: &str) -> StoreResult<Option<RoomRecord>> {
        let row = sqlx::query_as::<_, RoomRow>(
            "SELECT room_id, name, created_by, created_at, updated_at FROM rooms WHERE room_id = $1",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.with_participants(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn members_of_record(&self, room_id: &str) -> StoreResult<Vec<Uuid>> {
        if !self.exists(room_id).await? {
            return Err(StoreError::NotFound);
        }
        let members = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM room_participants WHERE room_id = $1 ORDER BY joined_at",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn rooms_for_user(&self, user: Uuid) -> StoreResult<Vec<RoomRecord>> {
        let rows = sqlx::query_as::<_, RoomRow>(
            r#"
            SELECT r.room_id, r.name, r.created_by, r.created_at, r.updated_at
            FROM rooms r
            JOIN room_participants p ON p.room_id = r.room_id
            WHERE p.user_id = $1
            ORDER BY r.updated_at DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        self.with_participants(rows).await
    }
}

#[async_trait]
impl DocumentStore for DbColab {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get(&self, room_id: &str) -> StoreResult<Option<DocumentSnapshot>> {
        self.log_pool_state(&format!("Loading document for room {}", room_id));
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE room_id = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DocumentSnapshot::from))
    }

    async fn create_if_absent(&self, room_id: &str, content: &str, creator: Uuid) -> StoreResult<DocumentSnapshot> {
        sqlx::query(
            r#"
            INSERT INTO documents (room_id, content, created_by, last_edited_by)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (room_id) DO NOTHING
            "#,
        )
        .bind(room_id)
        .bind(content)
        .bind(creator)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE room_id = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(room_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn upsert(&self, room_id: &str, content: &str, editor: Uuid) -> StoreResult<DocumentSnapshot> {
        self.log_pool_state(&format!("Saving document for room {}", room_id));
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            INSERT INTO documents (room_id, content, created_by, last_edited_by)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (room_id) DO UPDATE
            SET content = EXCLUDED.content,
                last_edited_by = EXCLUDED.last_edited_by,
                last_edited_at = NOW()
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(room_id)
        .bind(content)
        .bind(editor)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_content(&self, room_id: &str, content: &str) -> StoreResult<Option<DocumentSnapshot>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "UPDATE documents SET content = $2 WHERE room_id = $1 RETURNING {}",
            DOCUMENT_COLUMNS
        ))
        .bind(room_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DocumentSnapshot::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_every_table_idempotently() {
        for table in ["users", "rooms", "room_participants", "documents"] {
            assert!(SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", table)));
        }
        assert_eq!(SCHEMA.matches("CREATE TABLE ").count(), 4);
    }

    #[test]
    fn document_rows_map_to_snapshots() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let snapshot: DocumentSnapshot = DocumentRow {
            room_id: "r1".into(),
            content: "fn main() {}".into(),
            created_by: user,
            last_edited_by: None,
            created_at: now,
            last_edited_at: now,
        }
        .into();
        assert_eq!(snapshot.room_id, "r1");
        assert_eq!(snapshot.created_by, user);
        assert_eq!(snapshot.last_edited_by, None);
    }
}

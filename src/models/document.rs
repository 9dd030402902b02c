use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Content a freshly created room document starts with
pub const DEFAULT_SEED_CONTENT: &str = "// Start coding here...";

/// The authoritative text of a room plus its edit provenance
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub room_id: String,
    pub content: String,
    pub created_by: Uuid,
    pub last_edited_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
}

impl DocumentSnapshot {
    pub fn new(room_id: &str, content: &str, creator: Uuid) -> Self {
        let now = Utc::now();
        Self {
            room_id: room_id.to_string(),
            content: content.to_string(),
            created_by: creator,
            last_edited_by: Some(creator),
            created_at: now,
            last_edited_at: now,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct UpdateDocumentRequest {
    pub content: String,
}

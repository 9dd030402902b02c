pub mod dbcolab;

pub use dbcolab::DbColab;

use std::sync::Arc;

use crate::stores::Stores;

impl Stores {
    /// All three collaborators served by one Postgres pool
    pub fn postgres(db: DbColab) -> Self {
        let db = Arc::new(db);
        Self {
            identities: db.clone(),
            rooms: db.clone(),
            documents: db,
        }
    }
}

use moka::sync::Cache;
use std::time::Duration;
use tracing::info;

/// Latest broadcast text per room.
///
/// Edits land here synchronously while persistence runs behind, so a joiner
/// reads the newest content even when the document store lags. Entries idle
/// out; the store stays the durable copy.
pub struct LiveDocCache {
    cache: Cache<String, String>,
}

impl LiveDocCache {
    pub fn new(time_to_idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(time_to_idle)
            .build();
        info!("Document cache initialized");
        Self { cache }
    }

    pub fn latest(&self, room_id: &str) -> Option<String> {
        self.cache.get(room_id)
    }

    pub fn record(&self, room_id: &str, content: &str) {
        self.cache.insert(room_id.to_string(), content.to_string());
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::models::Identity;
use crate::stores::{IdentityDirectory, StoreResult};

/// Display name to identity lookups, cached in front of the identity directory.
///
/// Misses are not cached, so a user registered after a failed join can join
/// right away.
pub struct UserCtxCache {
    cache: Cache<String, Identity>,
    directory: Arc<dyn IdentityDirectory>,
}

impl UserCtxCache {
    pub fn new(directory: Arc<dyn IdentityDirectory>, time_to_idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(time_to_idle)
            .build();
        info!("User context cache initialized");
        Self { cache, directory }
    }

    pub async fn resolve(&self, display_name: &str) -> StoreResult<Option<Identity>> {
        if let Some(identity) = self.cache.get(display_name).await {
            return Ok(Some(identity));
        }

        info!("User context cache miss for {}. Loading from identity directory.", display_name);
        let identity = self.directory.resolve(display_name).await?;
        if let Some(identity) = &identity {
            self.cache.insert(display_name.to_string(), identity.clone()).await;
        }
        Ok(identity)
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryIdentityDirectory;

    #[tokio::test]
    async fn resolves_and_caches_known_users() {
        let directory = Arc::new(MemoryIdentityDirectory::new());
        let alice = directory.register("alice", "alice@example.com", "hash").await.unwrap();
        let cache = UserCtxCache::new(directory, Duration::from_secs(60));

        let first = cache.resolve("alice").await.unwrap().unwrap();
        let second = cache.resolve("alice").await.unwrap().unwrap();
        assert_eq!(first.id, alice.id);
        assert_eq!(second.id, alice.id);
    }

    #[tokio::test]
    async fn unknown_users_are_not_cached() {
        let directory = Arc::new(MemoryIdentityDirectory::new());
        let cache = UserCtxCache::new(directory.clone(), Duration::from_secs(60));

        assert!(cache.resolve("bob").await.unwrap().is_none());
        directory.register("bob", "bob@example.com", "hash").await.unwrap();
        assert!(cache.resolve("bob").await.unwrap().is_some());
    }
}

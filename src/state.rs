use std::sync::Arc;

use crate::config::Config;
use crate::stores::Stores;
use crate::ws::SessionCoordinator;

/// Shared by every HTTP and websocket handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stores: Stores,
    pub coordinator: Arc<SessionCoordinator>,
}

impl AppState {
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config, stores: Stores) -> Self {
        let coordinator = Arc::new(SessionCoordinator::new(&stores, &config));
        Self {
            config: Arc::new(config),
            stores,
            coordinator,
        }
    }
}

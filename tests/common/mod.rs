#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use colabri_rooms::config::Config;
use colabri_rooms::models::messages::SendMessage;
use colabri_rooms::stores::Stores;
use colabri_rooms::ws::{ConnectionId, Outbound, SessionCoordinator};
use tokio::sync::mpsc;

pub const USERS: [&str; 3] = ["alice", "bob", "carol"];

/// Stores with a few registered users
pub async fn seeded(stores: Stores) -> Stores {
    for name in USERS {
        stores
            .identities
            .register(name, &format!("{}@example.com", name), "not-a-real-hash")
            .await
            .unwrap();
    }
    stores
}

pub fn coordinator(stores: &Stores) -> Arc<SessionCoordinator> {
    Arc::new(SessionCoordinator::new(stores, &Config::default()))
}

/// One fake transport: the id the coordinator handed out plus what was pushed to it
pub struct Client {
    pub conn: ConnectionId,
    rx: mpsc::UnboundedReceiver<Outbound>,
}

impl Client {
    pub fn connect(coordinator: &SessionCoordinator) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = coordinator.connect(tx);
        Self { conn, rx }
    }

    pub fn drain(&mut self) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            out.push(item);
        }
        out
    }

    pub fn messages(&mut self) -> Vec<SendMessage> {
        self.drain()
            .into_iter()
            .filter_map(|item| match item {
                Outbound::Message(msg) => Some(msg),
                Outbound::Close { .. } => None,
            })
            .collect()
    }
}

/// Poll the document store until the room holds `expected` or two seconds pass
pub async fn wait_for_content(stores: &Stores, room_id: &str, expected: &str) -> bool {
    for _ in 0..200 {
        let stored = stores.documents.get(room_id).await.unwrap();
        if stored.is_some_and(|doc| doc.content == expected) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};

use super::connctx::{ConnCtx, ConnState, ConnectionId, Mailbox};
use super::docctx::LiveDocCache;
use super::error::SessionError;
use super::presence::{Eviction, PresenceTable};
use super::router::BroadcastRouter;
use super::userctx::UserCtxCache;
use crate::config::Config;
use crate::models::messages::{ClientEntry, DisconnectedMessage, JoinedMessage, SendMessage};
use crate::models::{Identity, DEFAULT_SEED_CONTENT};
use crate::stores::{DocumentStore, RoomDirectory, StoreError, Stores};

/// Close reason sent to a socket whose display name was claimed elsewhere
pub const SESSION_REPLACED: &str = "session replaced";

/// Reply to a successful join
#[derive(Debug, Clone, PartialEq)]
pub struct JoinAccepted {
    pub roster: Vec<ClientEntry>,
    pub document_content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub connections: usize,
    pub joined: usize,
    pub rooms: usize,
}

/// Everything the coordinator mutates. Only ever touched under its lock,
/// and the lock is never held across an await.
#[derive(Default)]
pub struct Sessions {
    pub presence: PresenceTable,
    conns: HashMap<ConnectionId, ConnCtx>,
}

impl Sessions {
    pub fn conn(&self, id: ConnectionId) -> Option<&ConnCtx> {
        self.conns.get(&id)
    }

    pub fn roster(&self, room_id: &str) -> Vec<ClientEntry> {
        self.presence
            .members_of(room_id)
            .into_iter()
            .map(|(socket_id, username)| ClientEntry { socket_id, username })
            .collect()
    }

    /// Push `msg` to every live member of `room_id` except `skip`.
    pub fn notify_room(&self, room_id: &str, skip: Option<ConnectionId>, msg: SendMessage) -> usize {
        self.presence
            .members_of(room_id)
            .into_iter()
            .filter(|(conn, _)| Some(*conn) != skip)
            .filter_map(|(conn, _)| self.conns.get(&conn))
            .filter(|ctx| ctx.send(msg.clone()))
            .count()
    }

    fn announce_departure(&self, room_id: &str, conn: ConnectionId, username: &str) {
        let msg = SendMessage::Disconnected(DisconnectedMessage {
            socket_id: conn,
            username: username.to_string(),
        });
        self.notify_room(room_id, Some(conn), msg);
    }

    /// `Ok` while the join attempt `epoch` still owns the connection
    fn check_attempt(&self, conn: ConnectionId, epoch: u64) -> Result<(), SessionError> {
        match self.conns.get(&conn) {
            None => Err(SessionError::ConnectionClosed),
            Some(ctx) if !ctx.state.is_live() => Err(SessionError::ConnectionClosed),
            Some(ctx) if ctx.join_epoch != epoch => Err(SessionError::Superseded),
            Some(_) => Ok(()),
        }
    }

    fn evict(&mut self, eviction: Eviction) {
        info!("Evicting {} ({}): display name claimed by a newer connection", eviction.connection, eviction.display_name);
        let Some(ctx) = self.conns.get_mut(&eviction.connection) else {
            return;
        };
        let was_live = ctx.state.is_live();
        ctx.state = ConnState::Closed;
        ctx.room_id = None;
        ctx.display_name = None;
        ctx.close(SESSION_REPLACED);

        if let (true, Some(room_id)) = (was_live, &eviction.room_id) {
            self.announce_departure(room_id, eviction.connection, &eviction.display_name);
        }
    }

    /// Leave notification for a connection about to go away. Peers only hear
    /// about it if it occupies a room, which a mid-rejoin connection still may.
    fn begin_teardown(&mut self, conn: ConnectionId) {
        let Some(ctx) = self.conns.get_mut(&conn) else {
            return;
        };
        if !ctx.state.is_live() {
            return;
        }
        ctx.state = ConnState::Disconnecting;

        let room_id = self.presence.room_of(conn).map(str::to_string);
        let username = self.presence.display_name(conn).map(str::to_string);
        if let (Some(room_id), Some(username)) = (room_id, username) {
            info!("User {} disconnecting from room {}", username, room_id);
            self.announce_departure(&room_id, conn, &username);
        }
    }
}

/// Connection lifecycle state machine and sole writer of the presence table.
///
/// `join` suspends on the identity directory, the room directory and the
/// document store. After every suspension it re-checks that the connection is
/// still alive and that no newer join took over, and unwinds its bind if not.
pub struct SessionCoordinator {
    sessions: Mutex<Sessions>,
    identities: Arc<UserCtxCache>,
    rooms: Arc<dyn RoomDirectory>,
    documents: Arc<dyn DocumentStore>,
    docs: Arc<LiveDocCache>,
    router: BroadcastRouter,
    enforce_room_registry: bool,
}

impl SessionCoordinator {
    /// Must be called from within a tokio runtime.
    pub fn new(stores: &Stores, config: &Config) -> Self {
        let identities = Arc::new(UserCtxCache::new(stores.identities.clone(), config.identity_cache_ttl()));
        let docs = Arc::new(LiveDocCache::new(config.doc_cache_ttl()));
        let router = BroadcastRouter::new(identities.clone(), stores.documents.clone(), docs.clone());
        Self {
            sessions: Mutex::new(Sessions::default()),
            identities,
            rooms: stores.rooms.clone(),
            documents: stores.documents.clone(),
            docs,
            router,
            enforce_room_registry: config.enforce_room_registry,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a freshly opened transport
    pub fn connect(&self, mailbox: Mailbox) -> ConnectionId {
        let conn = ConnectionId::new();
        self.sessions().conns.insert(conn, ConnCtx::new(mailbox));
        info!("New connection: {}", conn);
        conn
    }

    pub async fn join(&self, conn: ConnectionId, room_id: &str, display_name: &str) -> Result<JoinAccepted, SessionError> {
        // Whitespace-only values count as missing; anything else is used verbatim
        if room_id.trim().is_empty() || display_name.trim().is_empty() {
            warn!("Join error on {}: room ID and username are required", conn);
            return Err(SessionError::InvalidRequest);
        }

        let (epoch, prior) = {
            let mut sessions = self.sessions();
            let ctx = sessions
                .conns
                .get_mut(&conn)
                .filter(|ctx| ctx.state.is_live())
                .ok_or(SessionError::ConnectionClosed)?;
            let prior = ctx.state;
            ctx.state = ConnState::Joining;
            ctx.join_epoch += 1;
            (ctx.join_epoch, prior)
        };

        let identity = match self.admit(room_id, display_name).await {
            Ok(identity) => identity,
            Err(e) => {
                self.restore(conn, epoch, prior);
                return Err(e);
            }
        };

        {
            let mut sessions = self.sessions();
            sessions.check_attempt(conn, epoch)?;

            let previous_name = sessions.presence.display_name(conn).map(str::to_string);
            let previous_room = sessions.presence.room_of(conn).map(str::to_string);
            if let Some(eviction) = sessions.presence.bind(conn, display_name) {
                sessions.evict(eviction);
            }
            // Rejoining under another name already dropped the old room membership
            if let (Some(old_name), Some(old_room)) = (previous_name, previous_room) {
                if old_name != display_name {
                    sessions.announce_departure(&old_room, conn, &old_name);
                }
            }
            if let Some(ctx) = sessions.conns.get_mut(&conn) {
                ctx.display_name = Some(display_name.to_string());
            }
        }

        let content = match self.load_or_create(room_id, &identity).await {
            Ok(content) => content,
            Err(e) => {
                error!("Join error on {}: loading document for room {} failed: {}", conn, room_id, e);
                self.abandon(conn, epoch);
                return Err(SessionError::StoreUnavailable(e.to_string()));
            }
        };

        let mut sessions = self.sessions();
        if let Err(e) = sessions.check_attempt(conn, epoch) {
            if e == SessionError::ConnectionClosed {
                sessions.presence.unbind(conn);
            }
            warn!("Join of {} to room {} abandoned: {}", display_name, room_id, e);
            return Err(e);
        }

        if let Some(old_room) = sessions.presence.add_to_room(conn, room_id) {
            sessions.announce_departure(&old_room, conn, display_name);
        }
        if let Some(ctx) = sessions.conns.get_mut(&conn) {
            ctx.state = ConnState::Joined;
            ctx.room_id = Some(room_id.to_string());
        }

        let roster = sessions.roster(room_id);
        sessions.notify_room(
            room_id,
            Some(conn),
            SendMessage::Joined(JoinedMessage {
                clients: roster.clone(),
                username: display_name.to_string(),
                socket_id: conn,
            }),
        );
        info!("{} joined room {}", display_name, room_id);

        Ok(JoinAccepted { roster, document_content: content })
    }

    /// Relay an edit to the connection's room. `NotJoined` edits are dropped.
    pub fn edit(&self, conn: ConnectionId, room_id: &str, content: &str) -> Result<usize, SessionError> {
        let sessions = self.sessions();
        self.router.publish(&sessions, conn, room_id, content)
    }

    /// The transport announced an impending close
    pub fn disconnecting(&self, conn: ConnectionId) {
        self.sessions().begin_teardown(conn);
    }

    /// The transport is gone. Safe from any state, including mid-join.
    pub fn closed(&self, conn: ConnectionId) {
        let mut sessions = self.sessions();
        sessions.begin_teardown(conn);
        sessions.conns.remove(&conn);
        sessions.presence.unbind(conn);
        info!("Socket {} disconnected", conn);
    }

    /// Record content written outside the live session so joiners see it
    pub fn record_external_edit(&self, room_id: &str, content: &str) {
        self.docs.record(room_id, content);
    }

    pub fn members_of(&self, room_id: &str) -> Vec<ClientEntry> {
        self.sessions().roster(room_id)
    }

    pub fn state_of(&self, conn: ConnectionId) -> Option<ConnState> {
        self.sessions().conns.get(&conn).map(|ctx| ctx.state)
    }

    pub fn is_room_live(&self, room_id: &str) -> bool {
        self.sessions().presence.is_room_live(room_id)
    }

    pub fn stats(&self) -> SessionStats {
        let sessions = self.sessions();
        SessionStats {
            connections: sessions.conns.len(),
            joined: sessions.conns.values().filter(|c| c.state == ConnState::Joined).count(),
            rooms: sessions.presence.room_count(),
        }
    }

    pub fn cached_identities(&self) -> u64 {
        self.identities.entry_count()
    }

    pub fn cached_documents(&self) -> u64 {
        self.docs.entry_count()
    }

    /// Resolve the joining identity and, when enforced, the room
    async fn admit(&self, room_id: &str, display_name: &str) -> Result<Identity, SessionError> {
        let identity = match self.identities.resolve(display_name).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                warn!("Join error: user {} not found", display_name);
                return Err(SessionError::UnknownUser);
            }
            Err(e) => {
                error!("Join error: identity lookup for {} failed: {}", display_name, e);
                return Err(SessionError::StoreUnavailable(e.to_string()));
            }
        };

        if self.enforce_room_registry {
            match self.rooms.add_member(room_id, identity.id).await {
                Ok(_) => {}
                Err(StoreError::NotFound) => {
                    warn!("Join error: room {} is not registered", room_id);
                    return Err(SessionError::RoomNotFound);
                }
                Err(e) => {
                    error!("Join error: room lookup for {} failed: {}", room_id, e);
                    return Err(SessionError::StoreUnavailable(e.to_string()));
                }
            }
        }
        Ok(identity)
    }

    /// Newest text for the room: live cache first, then the store, creating
    /// the seeded document on first use.
    async fn load_or_create(&self, room_id: &str, identity: &Identity) -> Result<String, StoreError> {
        let snapshot = match self.documents.get(room_id).await? {
            Some(snapshot) => snapshot,
            None => {
                info!("Creating document for room {} on behalf of {}", room_id, identity.username);
                self.documents
                    .create_if_absent(room_id, DEFAULT_SEED_CONTENT, identity.id)
                    .await?
            }
        };
        Ok(self.docs.latest(room_id).unwrap_or(snapshot.content))
    }

    /// Undo a join that failed before binding
    fn restore(&self, conn: ConnectionId, epoch: u64, prior: ConnState) {
        let mut sessions = self.sessions();
        if sessions.check_attempt(conn, epoch).is_ok() {
            if let Some(ctx) = sessions.conns.get_mut(&conn) {
                ctx.state = prior;
            }
        }
    }

    /// Undo a join that failed after binding: the connection ends up unjoined
    fn abandon(&self, conn: ConnectionId, epoch: u64) {
        let mut sessions = self.sessions();
        if sessions.check_attempt(conn, epoch).is_err() {
            return;
        }
        if let Some(departure) = sessions.presence.unbind(conn) {
            if let Some(room_id) = departure.room_id {
                sessions.announce_departure(&room_id, conn, &departure.display_name);
            }
        }
        if let Some(ctx) = sessions.conns.get_mut(&conn) {
            ctx.state = ConnState::Unjoined;
            ctx.room_id = None;
            ctx.display_name = None;
        }
    }
}

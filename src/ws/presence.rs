use std::collections::HashMap;

use super::connctx::ConnectionId;

/// A binding that `bind` displaced. The caller owns terminating the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub connection: ConnectionId,
    pub display_name: String,
    pub room_id: Option<String>,
}

/// What `unbind` removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub display_name: String,
    pub room_id: Option<String>,
}

/// Process-wide record of which display name is bound to which live
/// connection, and which names are active in which room.
///
/// A display name maps to at most one connection; a connection occupies at
/// most one room. Rooms whose member list empties are dropped. The table does
/// no I/O, so every call is one atomic step for the coordinator holding it.
#[derive(Debug, Default)]
pub struct PresenceTable {
    names: HashMap<ConnectionId, String>,
    connections: HashMap<String, ConnectionId>,
    occupancy: HashMap<ConnectionId, String>,
    rooms: HashMap<String, Vec<String>>,
}

impl PresenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `display_name` to `conn`, evicting whichever other connection held it.
    pub fn bind(&mut self, conn: ConnectionId, display_name: &str) -> Option<Eviction> {
        let holder = self.connections.get(display_name).copied();
        let evicted = match holder {
            Some(holder) if holder != conn => {
                let departure = self.unbind(holder);
                Some(Eviction {
                    connection: holder,
                    display_name: display_name.to_string(),
                    room_id: departure.and_then(|d| d.room_id),
                })
            }
            _ => None,
        };

        // The connection switching names releases its previous one
        if self.names.get(&conn).is_some_and(|name| name != display_name) {
            self.unbind(conn);
        }

        self.names.insert(conn, display_name.to_string());
        self.connections.insert(display_name.to_string(), conn);
        evicted
    }

    /// Drop whatever `conn` holds. Unknown connections are a no-op.
    pub fn unbind(&mut self, conn: ConnectionId) -> Option<Departure> {
        let display_name = self.names.remove(&conn)?;
        if self.connections.get(&display_name) == Some(&conn) {
            self.connections.remove(&display_name);
        }
        let room_id = self.leave_room(conn, &display_name);
        Some(Departure { display_name, room_id })
    }

    /// Put the bound name of `conn` into `room_id`. Returns the room it moved
    /// out of, if any. Unbound connections are ignored.
    pub fn add_to_room(&mut self, conn: ConnectionId, room_id: &str) -> Option<String> {
        let display_name = self.names.get(&conn)?.clone();
        if self.occupancy.get(&conn).map(String::as_str) == Some(room_id) {
            return None;
        }
        let previous = self.leave_room(conn, &display_name);

        let members = self.rooms.entry(room_id.to_string()).or_default();
        if !members.contains(&display_name) {
            members.push(display_name);
        }
        self.occupancy.insert(conn, room_id.to_string());
        previous
    }

    /// Live roster of a room in join order
    pub fn members_of(&self, room_id: &str) -> Vec<(ConnectionId, String)> {
        self.rooms
            .get(room_id)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|name| self.connections.get(name).map(|conn| (*conn, name.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn display_name(&self, conn: ConnectionId) -> Option<&str> {
        self.names.get(&conn).map(String::as_str)
    }

    pub fn room_of(&self, conn: ConnectionId) -> Option<&str> {
        self.occupancy.get(&conn).map(String::as_str)
    }

    pub fn connection_of(&self, display_name: &str) -> Option<ConnectionId> {
        self.connections.get(display_name).copied()
    }

    pub fn is_room_live(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn bound_count(&self) -> usize {
        self.names.len()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn leave_room(&mut self, conn: ConnectionId, display_name: &str) -> Option<String> {
        let room_id = self.occupancy.remove(&conn)?;
        if let Some(members) = self.rooms.get_mut(&room_id) {
            members.retain(|name| name != display_name);
            if members.is_empty() {
                self.rooms.remove(&room_id);
            }
        }
        Some(room_id)
    }
}

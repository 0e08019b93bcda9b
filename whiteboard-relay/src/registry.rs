//! Connection registry: the set of open connections grouped by room.
//!
//! The registry is the only shared mutable state in the relay. Every
//! connection registers its outbound channel on connect, removes it on
//! disconnect, and broadcasts through a snapshot of its room's members.

use std::collections::HashMap;
use std::fmt;

use axum::extract::ws::Message;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::room::RoomName;

/// Sender half of a connection's outbound queue.
///
/// The receiving half is drained by the connection's WebSocket writer task,
/// so pushing into it never waits on the peer's socket.
pub type Outbound = mpsc::UnboundedSender<Message>;

/// Unique identity of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh, time-ordered connection id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Open connections indexed by room.
///
/// Thread-safe via [`RwLock`]. Rooms are created implicitly by the first
/// `add` and dropped when their last member is removed.
pub struct ConnectionRegistry {
    rooms: RwLock<HashMap<RoomName, HashMap<ConnectionId, Outbound>>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a connection in `room` and returns its id.
    pub async fn add(&self, room: &RoomName, sender: Outbound) -> ConnectionId {
        let id = ConnectionId::new();
        let mut rooms = self.rooms.write().await;
        rooms.entry(room.clone()).or_default().insert(id, sender);
        id
    }

    /// Removes a connection, returning `true` if it was registered.
    pub async fn remove(&self, room: &RoomName, id: ConnectionId) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&id).is_some();
        if members.is_empty() {
            rooms.remove(room);
        }
        drop(rooms);
        removed
    }

    /// Returns the outbound senders of every member of `room` except `except`.
    pub async fn snapshot(&self, room: &RoomName, except: ConnectionId) -> Vec<Outbound> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room)
            .map(|members| {
                members
                    .iter()
                    .filter(|(id, _)| **id != except)
                    .map(|(_, sender)| sender.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Hands `message` to every other member of `room`.
    ///
    /// A member whose channel is already closed is skipped; it does not stop
    /// delivery to the rest. Returns the number of members the message was
    /// handed to.
    pub async fn broadcast(&self, room: &RoomName, from: ConnectionId, message: &Message) -> usize {
        let mut delivered = 0;
        for sender in self.snapshot(room, from).await {
            if sender.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(room = %room, "skipping closed recipient");
            }
        }
        delivered
    }

    /// Queues a Close frame on every registered connection.
    pub async fn close_all(&self) {
        let rooms = self.rooms.read().await;
        for (room, members) in rooms.iter() {
            for (id, sender) in members {
                tracing::debug!(room = %room, connection = %id, "sending close frame");
                let _ = sender.send(Message::Close(None));
            }
        }
    }

    /// Total number of open connections.
    pub async fn len(&self) -> usize {
        self.rooms.read().await.values().map(HashMap::len).sum()
    }

    /// Returns `true` if no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }

    /// Number of open connections in `room`.
    pub async fn room_size(&self, room: &RoomName) -> usize {
        self.rooms.read().await.get(room).map_or(0, HashMap::len)
    }

    /// Number of rooms with at least one member.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

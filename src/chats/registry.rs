use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Identifies one live connection within the registry. Generated fresh for
/// every accepted socket; never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
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
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outbound handle to one connection. The registry only ever holds clones
/// of this; the receiving half stays with the session that owns the socket.
pub type Outbound = mpsc::UnboundedSender<String>;

/// Tracks which connections are attached to which chat room.
///
/// Attach and detach take the write lock; broadcast takes the read lock and
/// pushes into unbounded senders without awaiting, so broadcasts to distinct
/// rooms run in parallel while mutation of a room's set is serialized
/// against every send touching it. A room entry exists exactly as long as
/// at least one connection is attached to it.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    rooms: Arc<RwLock<HashMap<Uuid, HashMap<ConnectionId, Outbound>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attach(&self, chat_id: Uuid, conn_id: ConnectionId, tx: Outbound) {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(chat_id).or_default();
        room.insert(conn_id, tx);
        tracing::debug!(%chat_id, %conn_id, connections = room.len(), "attached");
    }

    /// Removes the connection from the room; dropping the last connection
    /// deletes the room entry. Unknown rooms and connections are a no-op.
    pub async fn detach(&self, chat_id: Uuid, conn_id: ConnectionId) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(&chat_id) else {
            return;
        };
        room.remove(&conn_id);
        let remaining = room.len();
        if remaining == 0 {
            rooms.remove(&chat_id);
        }
        tracing::debug!(%chat_id, %conn_id, connections = remaining, "detached");
    }

    /// Delivers `payload` to every connection currently attached to the
    /// room. A peer whose channel is gone is skipped; the rest still get
    /// the payload. Returns how many connections it was handed to.
    pub async fn broadcast(&self, chat_id: Uuid, payload: &str) -> usize {
        let rooms = self.rooms.read().await;
        let Some(room) = rooms.get(&chat_id) else {
            return 0;
        };

        let mut delivered = 0;
        for (conn_id, tx) in room {
            if tx.send(payload.to_owned()).is_err() {
                tracing::warn!(%chat_id, %conn_id, "send to closed connection, skipping");
            } else {
                delivered += 1;
            }
        }
        delivered
    }

    /// Whether any connection is attached to the room right now.
    pub async fn has_room(&self, chat_id: Uuid) -> bool {
        self.rooms.read().await.contains_key(&chat_id)
    }

    pub async fn connection_count(&self, chat_id: Uuid) -> usize {
        self.rooms
            .read()
            .await
            .get(&chat_id)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attach_pair() -> (ConnectionId, Outbound, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionId::new(), tx, rx)
    }

    #[tokio::test]
    async fn broadcast_reaches_every_attached_connection_once() {
        let registry = ConnectionRegistry::new();
        let chat_id = Uuid::now_v7();

        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (conn_id, tx, rx) = attach_pair();
            registry.attach(chat_id, conn_id, tx).await;
            receivers.push(rx);
        }

        let delivered = registry.broadcast(chat_id, "hello").await;
        assert_eq!(delivered, 3);

        for rx in &mut receivers {
            assert_eq!(rx.recv().await.as_deref(), Some("hello"));
            assert!(rx.try_recv().is_err(), "payload delivered more than once");
        }
    }

    #[tokio::test]
    async fn empty_room_entry_is_removed_after_last_detach() {
        let registry = ConnectionRegistry::new();
        let chat_id = Uuid::now_v7();

        let (a, tx_a, _rx_a) = attach_pair();
        let (b, tx_b, _rx_b) = attach_pair();
        registry.attach(chat_id, a, tx_a).await;
        registry.attach(chat_id, b, tx_b).await;

        registry.detach(chat_id, a).await;
        assert!(registry.has_room(chat_id).await);
        assert_eq!(registry.connection_count(chat_id).await, 1);

        registry.detach(chat_id, b).await;
        assert!(!registry.has_room(chat_id).await);
        assert_eq!(registry.broadcast(chat_id, "nobody home").await, 0);
    }

    #[tokio::test]
    async fn detach_of_unknown_connection_is_a_noop() {
        let registry = ConnectionRegistry::new();
        let chat_id = Uuid::now_v7();

        registry.detach(chat_id, ConnectionId::new()).await;

        let (a, tx_a, mut rx_a) = attach_pair();
        registry.attach(chat_id, a, tx_a).await;
        registry.detach(chat_id, ConnectionId::new()).await;

        assert_eq!(registry.broadcast(chat_id, "still here").await, 1);
        assert_eq!(rx_a.recv().await.as_deref(), Some("still here"));
    }

    #[tokio::test]
    async fn dead_peer_does_not_block_delivery_to_others() {
        let registry = ConnectionRegistry::new();
        let chat_id = Uuid::now_v7();

        let (a, tx_a, mut rx_a) = attach_pair();
        let (b, tx_b, rx_b) = attach_pair();
        let (c, tx_c, mut rx_c) = attach_pair();
        registry.attach(chat_id, a, tx_a).await;
        registry.attach(chat_id, b, tx_b).await;
        registry.attach(chat_id, c, tx_c).await;

        // Simulate a transport fault on b by dropping its receiving half.
        drop(rx_b);

        let delivered = registry.broadcast(chat_id, "survivors").await;
        assert_eq!(delivered, 2);
        assert_eq!(rx_a.recv().await.as_deref(), Some("survivors"));
        assert_eq!(rx_c.recv().await.as_deref(), Some("survivors"));
    }

    #[tokio::test]
    async fn rooms_are_independent() {
        let registry = ConnectionRegistry::new();
        let room_1 = Uuid::now_v7();
        let room_2 = Uuid::now_v7();

        let (a, tx_a, mut rx_a) = attach_pair();
        let (b, tx_b, mut rx_b) = attach_pair();
        registry.attach(room_1, a, tx_a).await;
        registry.attach(room_2, b, tx_b).await;

        registry.broadcast(room_1, "one").await;
        assert_eq!(rx_a.recv().await.as_deref(), Some("one"));
        assert!(rx_b.try_recv().is_err());

        registry.detach(room_1, a).await;
        assert!(!registry.has_room(room_1).await);
        assert!(registry.has_room(room_2).await);
    }
}

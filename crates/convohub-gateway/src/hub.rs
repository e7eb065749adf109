use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use convohub_types::events::ChatFrame;

pub const DEFAULT_BUFFER: usize = 64;

/// Live chat connections grouped by room.
///
/// Every connection owns a bounded queue. Fan-out never waits on a
/// subscriber: a frame that does not fit in a full queue is dropped for
/// that connection only.
#[derive(Clone)]
pub struct RoomHub {
    inner: Arc<RoomHubInner>,
}

struct RoomHubInner {
    /// room_id -> (conn_id -> sender)
    rooms: RwLock<HashMap<i64, HashMap<Uuid, mpsc::Sender<ChatFrame>>>>,

    /// Per-connection queue depth
    buffer: usize,
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl RoomHub {
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(RoomHubInner {
                rooms: RwLock::new(HashMap::new()),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Register a connection in a room's group. Returns (conn_id, receiver).
    pub async fn register(&self, room_id: i64) -> (Uuid, mpsc::Receiver<ChatFrame>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        self.inner
            .rooms
            .write()
            .await
            .entry(room_id)
            .or_default()
            .insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Remove a connection from a room's group. Unknown ids are ignored.
    pub async fn unregister(&self, room_id: i64, conn_id: Uuid) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(conns) = rooms.get_mut(&room_id) {
            conns.remove(&conn_id);
            if conns.is_empty() {
                rooms.remove(&room_id);
            }
        }
    }

    /// Offer a frame to every connection currently registered in the room.
    /// Returns how many connections accepted it.
    pub async fn broadcast(&self, room_id: i64, frame: ChatFrame) -> usize {
        let rooms = self.inner.rooms.read().await;
        let Some(conns) = rooms.get(&room_id) else {
            return 0;
        };

        let mut delivered = 0;
        for (conn_id, tx) in conns {
            match tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Connection {} in room {} is not keeping up, frame dropped", conn_id, room_id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Connection {} in room {} already closed", conn_id, room_id);
                }
            }
        }
        delivered
    }

    pub async fn connection_count(&self, room_id: i64) -> usize {
        self.inner
            .rooms
            .read()
            .await
            .get(&room_id)
            .map_or(0, HashMap::len)
    }
}

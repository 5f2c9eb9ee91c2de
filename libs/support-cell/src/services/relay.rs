use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Outbound frames buffered per socket before new ones are dropped.
pub const LISTENER_BUFFER: usize = 64;

struct Listener {
    connection: Uuid,
    sender: mpsc::Sender<String>,
}

/// Routes text to the socket currently listening on each chat.
///
/// One listener per chat: a newer connection replaces the older one, whose
/// channel is dropped so its writer finishes.
#[derive(Default)]
pub struct ChatRelay {
    listeners: RwLock<HashMap<i64, Listener>>,
}

impl ChatRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, chat_id: i64, sender: mpsc::Sender<String>) -> Uuid {
        let connection = Uuid::new_v4();
        let previous = self
            .listeners
            .write()
            .await
            .insert(chat_id, Listener { connection, sender });

        if let Some(previous) = previous {
            debug!("Connection {} replaced on chat {}", previous.connection, chat_id);
        }
        debug!("Connection {} listening on chat {}", connection, chat_id);
        connection
    }

    /// Removes the listener only if it is still `connection`.
    pub async fn unregister(&self, chat_id: i64, connection: Uuid) -> bool {
        let mut listeners = self.listeners.write().await;
        match listeners.get(&chat_id) {
            Some(listener) if listener.connection == connection => {
                listeners.remove(&chat_id);
                debug!("Connection {} left chat {}", connection, chat_id);
                true
            }
            _ => false,
        }
    }

    /// Delivers `text` to the chat's listener. Returns false when nobody is listening.
    pub async fn send(&self, chat_id: i64, text: String) -> bool {
        let listeners = self.listeners.read().await;
        let Some(listener) = listeners.get(&chat_id) else {
            return false;
        };

        match listener.sender.try_send(text) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Listener on chat {} is not keeping up, frame dropped", chat_id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub async fn is_listening(&self, chat_id: i64) -> bool {
        self.listeners.read().await.contains_key(&chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_registered_listener() {
        let relay = ChatRelay::new();
        let (tx, mut rx) = mpsc::channel(LISTENER_BUFFER);
        relay.register(7, tx).await;

        assert!(relay.send(7, "hello".to_string()).await);
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
        assert!(!relay.send(8, "nobody".to_string()).await);
    }

    #[tokio::test]
    async fn newer_connection_replaces_older_one() {
        let relay = ChatRelay::new();
        let (old_tx, mut old_rx) = mpsc::channel(LISTENER_BUFFER);
        let (new_tx, mut new_rx) = mpsc::channel(LISTENER_BUFFER);

        let old = relay.register(7, old_tx).await;
        let new = relay.register(7, new_tx).await;
        assert_ne!(old, new);

        relay.send(7, "to the newest".to_string()).await;
        assert_eq!(new_rx.recv().await.as_deref(), Some("to the newest"));
        // the old sender was dropped on replacement
        assert_eq!(old_rx.recv().await, None);
    }

    #[tokio::test]
    async fn stale_unregister_keeps_current_listener() {
        let relay = ChatRelay::new();
        let (old_tx, _old_rx) = mpsc::channel(LISTENER_BUFFER);
        let (new_tx, _new_rx) = mpsc::channel(LISTENER_BUFFER);

        let old = relay.register(7, old_tx).await;
        let new = relay.register(7, new_tx).await;

        assert!(!relay.unregister(7, old).await);
        assert!(relay.is_listening(7).await);

        assert!(relay.unregister(7, new).await);
        assert!(!relay.is_listening(7).await);
    }

    #[tokio::test]
    async fn full_buffer_drops_frames() {
        let relay = ChatRelay::new();
        let (tx, _rx) = mpsc::channel(1);
        relay.register(7, tx).await;

        assert!(relay.send(7, "first".to_string()).await);
        assert!(!relay.send(7, "second".to_string()).await);
    }
}

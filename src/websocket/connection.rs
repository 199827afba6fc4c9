use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::types::WsMessage;

pub type WsSender = mpsc::UnboundedSender<WsMessage>;

/// Open websocket connections, several per user when they have several clients.
#[derive(Clone)]
pub struct ConnectionManager {
    connections: Arc<DashMap<Uuid, Vec<(Uuid, WsSender)>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Registers a connection and returns its id for later removal.
    pub fn add_connection(&self, user_id: Uuid, sender: WsSender) -> Uuid {
        let connection_id = Uuid::new_v4();
        self.connections
            .entry(user_id)
            .or_default()
            .push((connection_id, sender));
        tracing::info!(%user_id, %connection_id, "websocket connected");
        connection_id
    }

    pub fn remove_connection(&self, user_id: &Uuid, connection_id: &Uuid) {
        self.connections.remove_if_mut(user_id, |_, senders| {
            senders.retain(|(id, _)| id != connection_id);
            senders.is_empty()
        });
        tracing::info!(%user_id, %connection_id, "websocket disconnected");
    }

    /// Sends to every connection of the user. Returns whether any accepted it.
    pub fn send_to_user(&self, user_id: &Uuid, message: WsMessage) -> bool {
        let Some(mut senders) = self.connections.get_mut(user_id) else {
            return false;
        };

        senders.retain(|(_, sender)| sender.send(message.clone()).is_ok());
        let delivered = !senders.is_empty();
        // The shard lock must be released before removing.
        drop(senders);

        if !delivered {
            self.connections.remove_if(user_id, |_, senders| senders.is_empty());
        }
        delivered
    }

    pub fn send_to_users(&self, user_ids: &[Uuid], message: WsMessage) {
        for user_id in user_ids {
            self.send_to_user(user_id, message.clone());
        }
    }

    pub fn is_user_online(&self, user_id: &Uuid) -> bool {
        self.connections.contains_key(user_id)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

use crate::network::events::ServerEvent;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type ClientId = Uuid;

/// Sending half of one browser connection. The socket task owns the receiver.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ClientId,
    tx: mpsc::Sender<String>,
}

impl ClientHandle {
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ClientId {
        self.id
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    /// Clients whose queue was full; they miss this event but stay connected.
    pub dropped: usize,
    /// Clients whose socket task has gone away.
    pub removed: usize,
}

/// Set of connected clients and fan-out of server events to them.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    clients: RwLock<HashMap<ClientId, ClientHandle>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the client was already registered.
    pub async fn register(&self, client: ClientHandle) -> bool {
        let id = client.id();
        let mut clients = self.clients.write().await;
        let added = clients.insert(id, client).is_none();
        info!(client_id = %id, clients = clients.len(), "Client registered");
        added
    }

    /// Removing an unknown client is a no-op.
    pub async fn unregister(&self, id: ClientId) -> bool {
        let mut clients = self.clients.write().await;
        let removed = clients.remove(&id).is_some();
        if removed {
            info!(client_id = %id, clients = clients.len(), "Client unregistered");
        }
        removed
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Sends to a single client without waiting. A full queue drops the event like
    /// `publish` does; a closed one removes the client.
    pub async fn send_to(&self, id: ClientId, event: &ServerEvent) -> bool {
        let Some(client) = self.clients.read().await.get(&id).cloned() else {
            debug!(client_id = %id, "Dropping {} for unknown client", event.kind());
            return false;
        };
        let Some(json) = event.to_json() else {
            return false;
        };
        match client.tx.try_send(json) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(client_id = %id, "Client queue full, dropping {}", event.kind());
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.unregister(id).await;
                false
            }
        }
    }

    /// Delivers to every client registered when the call starts. A client whose channel is
    /// closed is removed; one failing client never stops delivery to the rest.
    pub async fn publish(&self, event: &ServerEvent) -> PublishReport {
        let mut report = PublishReport::default();
        let Some(json) = event.to_json() else {
            return report;
        };

        let clients: Vec<ClientHandle> = self.clients.read().await.values().cloned().collect();
        let mut closed = Vec::new();
        for client in clients {
            match client.tx.try_send(json.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(client_id = %client.id, "Client queue full, dropping {}", event.kind());
                    report.dropped += 1;
                }
                Err(TrySendError::Closed(_)) => closed.push(client.id),
            }
        }

        if !closed.is_empty() {
            let mut clients = self.clients.write().await;
            for id in closed {
                if clients.remove(&id).is_some() {
                    warn!(client_id = %id, "Removing client after failed send");
                    report.removed += 1;
                }
            }
        }
        report
    }

    /// Drops every client handle so each socket task sees its channel end and closes.
    pub async fn close_all(&self) -> usize {
        let mut clients = self.clients.write().await;
        let count = clients.len();
        clients.clear();
        info!("Closed {} client connections", count);
        count
    }
}

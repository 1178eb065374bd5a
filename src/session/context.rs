use crate::network::hub::BroadcastHub;
use crate::pipeline::types::FingerState;
use tokio::sync::RwLock;

/// State shared by the session manager, the capture loop and every connection task.
#[derive(Debug, Default)]
pub struct SessionContext {
    hub: BroadcastHub,
    fingers: RwLock<FingerState>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Latest 10-slot snapshot, as sent in `initial_state`.
    pub async fn fingers(&self) -> FingerState {
        *self.fingers.read().await
    }

    pub(crate) async fn store_fingers(&self, state: FingerState) {
        *self.fingers.write().await = state;
    }
}

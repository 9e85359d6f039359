use super::connection::ConnectionState;
use crate::infrastructure::TaskManager;
use tokio::sync::watch;

/// Consolidated mutable state for StatusClient
/// Using a single struct reduces lock contention
pub struct ClientState {
    /// Background task manager (read loop, heartbeat monitor)
    pub task_manager: TaskManager,

    /// Whether the disconnect was manual (prevents auto-reconnect)
    pub was_manual_disconnect: bool,

    /// Sender for state change notifications
    pub state_change_tx: Option<watch::Sender<(ConnectionState, bool)>>,
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            task_manager: TaskManager::new(),
            was_manual_disconnect: false,
            state_change_tx: None,
        }
    }

    /// Notify state change watchers
    pub fn notify_state_change(&self, state: ConnectionState, manual: bool) {
        if let Some(tx) = &self.state_change_tx {
            if tx.send((state, manual)).is_err() {
                tracing::debug!(
                    "State change watcher disconnected, could not notify state: {:?}",
                    state
                );
            }
        }
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Connection status values delivered to listeners (e.g. a dashboard
/// connection indicator). `Error` means automatic retries were exhausted and
/// a fresh `connect()` is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        };
        write!(f, "{}", s)
    }
}

type ListenerFn = dyn Fn(ConnectionStatus) + Send + Sync;

struct BroadcasterInner {
    listeners: HashMap<u64, Arc<ListenerFn>>,
    next_token: u64,
    current: ConnectionStatus,
}

/// Fans out connection-status transitions to any number of listeners.
///
/// Listeners are keyed by a generated token so removal is stable regardless
/// of registration order, and each invocation is isolated: a panicking
/// listener is logged and the remaining listeners still run.
pub struct StatusBroadcaster {
    inner: RwLock<BroadcasterInner>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BroadcasterInner {
                listeners: HashMap::new(),
                next_token: 0,
                current: ConnectionStatus::Disconnected,
            }),
        }
    }

    /// Registers a listener and returns its removal token
    pub async fn add_listener<F>(&self, listener: F) -> u64
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        let mut inner = self.inner.write().await;
        let token = inner.next_token;
        inner.next_token += 1;
        inner.listeners.insert(token, Arc::new(listener));
        token
    }

    pub async fn remove_listener(&self, token: u64) {
        self.inner.write().await.listeners.remove(&token);
    }

    /// Last published status (`Disconnected` before any transition)
    pub async fn current(&self) -> ConnectionStatus {
        self.inner.read().await.current
    }

    /// Publishes a transition to every registered listener
    pub async fn publish(&self, status: ConnectionStatus) {
        let listeners: Vec<Arc<ListenerFn>> = {
            let mut inner = self.inner.write().await;
            inner.current = status;
            inner.listeners.values().cloned().collect()
        };

        tracing::debug!("Connection status: {}", status);
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(status))).is_err() {
                tracing::error!("Status listener panicked on {} notification", status);
            }
        }
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Removal handle returned by listener registration; deregisters exactly the
/// listener instance it was issued for.
pub struct StatusListenerHandle {
    token: u64,
    broadcaster: Arc<StatusBroadcaster>,
}

impl StatusListenerHandle {
    pub(crate) fn new(token: u64, broadcaster: Arc<StatusBroadcaster>) -> Self {
        Self { token, broadcaster }
    }

    /// Stops delivery to this listener
    pub async fn remove(self) {
        self.broadcaster.remove_listener(self.token).await;
    }
}

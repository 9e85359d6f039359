use super::{ClientState, ConnectionManager, ConnectionState, StatusClient};
use crate::channel::SubscriptionRegistry;
use crate::infrastructure::Backoff;
use crate::messaging::EventDispatcher;
use crate::status::StatusBroadcaster;
use crate::transport::{Transport, WebSocketTransport};
use crate::types::constants::{
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY, RECONNECT_MAX_DELAY,
};
use crate::types::{Result, StatusError};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use url::Url;

/// Configuration for a [`StatusClient`]. All fields are optional; defaults
/// match the reference deployment (4 s heartbeats, 1 s base backoff doubling
/// to 30 s, 10 attempts).
#[derive(Debug, Clone, Default)]
pub struct StatusClientOptions {
    /// Externally supplied credential, sent as a query parameter on the
    /// handshake URL
    pub access_token: Option<String>,
    /// Heartbeat interval offered in both directions (milliseconds)
    pub heartbeat_interval: Option<u64>,
    /// How long to wait for the CONNECTED handshake frame (milliseconds)
    pub handshake_timeout: Option<u64>,
    /// Base reconnect delay (milliseconds)
    pub reconnect_base_delay: Option<u64>,
    /// Reconnect delay ceiling (milliseconds)
    pub reconnect_max_delay: Option<u64>,
    /// Consecutive failures tolerated before giving up
    pub max_reconnect_attempts: Option<u32>,
}

/// Builder for StatusClient that handles initialization
pub struct StatusClientBuilder {
    endpoint: String,
    options: StatusClientOptions,
    transport: Option<Arc<dyn Transport>>,
}

impl StatusClientBuilder {
    /// Create a new builder
    pub fn new(endpoint: impl Into<String>, options: StatusClientOptions) -> Result<Self> {
        let endpoint = endpoint.into();

        // Validate the endpoint up front; transport failures later are
        // recovered automatically, config mistakes are not
        let url = Url::parse(&endpoint)?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(StatusError::Connection(format!(
                "endpoint must use ws:// or wss://, got {}://",
                url.scheme()
            )));
        }

        Ok(Self {
            endpoint,
            options,
            transport: None,
        })
    }

    /// Swaps in an alternative transport implementation
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client and spawn the reconnection watcher
    pub fn build(self) -> StatusClient {
        let mut client_state = ClientState::new();

        // Initialize state watcher channel
        let (state_tx, state_rx) = watch::channel((ConnectionState::Disconnected, false));
        client_state.state_change_tx = Some(state_tx);

        let backoff = Backoff::new(
            self.options
                .reconnect_base_delay
                .unwrap_or(RECONNECT_BASE_DELAY),
            self.options
                .reconnect_max_delay
                .unwrap_or(RECONNECT_MAX_DELAY),
            self.options
                .max_reconnect_attempts
                .unwrap_or(MAX_RECONNECT_ATTEMPTS),
        );

        let registry = Arc::new(SubscriptionRegistry::new());
        let client = StatusClient {
            endpoint: self.endpoint,
            options: self.options,
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(WebSocketTransport)),
            connection: Arc::new(ConnectionManager::new()),
            dispatcher: Arc::new(EventDispatcher::new(Arc::clone(&registry))),
            registry,
            broadcaster: Arc::new(StatusBroadcaster::new()),
            backoff: Arc::new(Mutex::new(backoff)),
            state: Arc::new(RwLock::new(client_state)),
        };

        // Spawn reconnection watcher task
        let client_for_watcher = client.clone();
        tokio::spawn(async move {
            let mut rx = state_rx;

            while rx.changed().await.is_ok() {
                let (state, was_manual) = *rx.borrow_and_update();

                // Reconnect if disconnected AND not manual
                if state == ConnectionState::Disconnected && !was_manual {
                    tracing::info!("State watcher detected disconnect, attempting reconnection...");
                    client_for_watcher.try_reconnect().await;
                }
            }
            tracing::debug!("Reconnection watcher task finished");
        });

        client
    }
}

use super::{ClientState, ConnectionManager, ConnectionState, StatusClientBuilder, StatusClientOptions};
use crate::channel::{EventHandler, Subscription, SubscriptionRegistry};
use crate::infrastructure::{Backoff, HeartbeatMonitor};
use crate::messaging::frame::negotiate_heartbeat;
use crate::messaging::{EventDispatcher, Frame, FrameCommand};
use crate::status::{ConnectionStatus, StatusBroadcaster, StatusListenerHandle};
use crate::types::constants::{
    channels, stomp_headers, topics, ACCESS_TOKEN_PARAM, DEFAULT_HANDSHAKE_TIMEOUT,
    HEARTBEAT_INTERVAL,
};
use crate::transport::{Transport, TransportHandle};
use crate::types::{Result, StatusError, StatusEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::Instant;
use url::Url;

/// The realtime status session for the OpsBoard dashboard.
///
/// A `StatusClient` owns exactly one logical pub/sub session to the status
/// server: it drives the connection state machine, keeps channel
/// subscriptions durable across reconnects, dispatches decoded status events
/// to per-channel handlers, and feeds connection-state transitions to status
/// listeners. Once `connect()` has been called the session is either actively
/// connected or actively retrying with exponential backoff, never silently
/// dead, until `disconnect()` or retry exhaustion.
///
/// The client is cheap to clone; clones share the same session. Construct it
/// once at application start and hand it to whoever needs it; there is no
/// hidden global instance.
///
/// # Example
///
/// ```no_run
/// use opsboard_realtime::{StatusClient, StatusClientOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = StatusClient::new(
///     "wss://opsboard.example.com/ws/status",
///     StatusClientOptions {
///         access_token: Some("jwt-from-login".to_string()),
///         ..Default::default()
///     },
/// )?;
///
/// let _extractions = client
///     .subscribe_to_extractions(|event| {
///         println!("extraction {:?}: {:?}", event.entity_id, event.status);
///     })
///     .await;
///
/// client.connect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StatusClient {
    pub(crate) endpoint: String,
    pub(crate) options: StatusClientOptions,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) connection: Arc<ConnectionManager>,
    pub(crate) registry: Arc<SubscriptionRegistry>,
    pub(crate) dispatcher: Arc<EventDispatcher>,
    pub(crate) broadcaster: Arc<StatusBroadcaster>,
    pub(crate) backoff: Arc<Mutex<Backoff>>,
    pub(crate) state: Arc<RwLock<ClientState>>,
}

impl StatusClient {
    /// Creates a client with the default websocket transport.
    ///
    /// This validates the endpoint but does not open a connection; call
    /// [`connect()`](Self::connect) to establish the session.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::UrlParse`] for a malformed endpoint and
    /// [`StatusError::Connection`] for a non-websocket scheme.
    pub fn new(endpoint: impl Into<String>, options: StatusClientOptions) -> Result<Self> {
        StatusClientBuilder::new(endpoint, options).map(|builder| builder.build())
    }

    /// Builder entry point, used to inject an alternative transport
    pub fn builder(
        endpoint: impl Into<String>,
        options: StatusClientOptions,
    ) -> Result<StatusClientBuilder> {
        StatusClientBuilder::new(endpoint, options)
    }

    /// Opens the session.
    ///
    /// Idempotent: while a connection is open or an attempt is in flight this
    /// is a logged no-op. Transport and handshake failures are not returned;
    /// they feed the reconnection policy and surface through status
    /// listeners; the attempt counter starts fresh on every caller-initiated
    /// connect.
    ///
    /// # Errors
    ///
    /// Only synchronous configuration problems (a malformed endpoint URL)
    /// produce an error.
    pub async fn connect(&self) -> Result<()> {
        {
            let state = self.connection.state().await;
            if state != ConnectionState::Disconnected {
                tracing::info!("connect() ignored, session is already {:?}", state);
                return Ok(());
            }
        }

        // catch config mistakes before touching any state
        self.build_endpoint_url()?;

        self.state.write().await.was_manual_disconnect = false;
        self.backoff.lock().await.reset();

        if let Err(e) = self.try_connect_once().await {
            tracing::error!("Connection attempt failed: {}", e);
            self.handle_attempt_failure().await;
        }
        Ok(())
    }

    /// Closes the session and stops the retry cycle.
    ///
    /// Cancels all channel subscriptions, invalidates any pending reconnect
    /// timer, closes the transport and notifies listeners. A later
    /// `connect()` starts over with a fresh attempt counter.
    pub async fn disconnect(&self) {
        tracing::info!("Disconnecting from status server");
        {
            let mut state = self.state.write().await;
            state.was_manual_disconnect = true;
            state.task_manager.abort_all();
            // wake any pending retry so it can observe the manual flag
            let conn_state = self.connection.state().await;
            state.notify_state_change(conn_state, true);
        }

        self.registry.clear(&self.connection).await;
        if self.connection.is_connected().await {
            let _ = self.connection.send_frame(&Frame::disconnect()).await;
        }
        self.connection.clear_writer().await;
        self.set_state(ConnectionState::Disconnected).await;
        tracing::info!("Disconnected from status server");
    }

    /// Pure read of the connection state, no side effects
    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    /// Last status published to listeners (`Disconnected` before the first
    /// connect, `Error` after retry exhaustion)
    pub async fn connection_status(&self) -> ConnectionStatus {
        self.broadcaster.current().await
    }

    /// Declares interest in a channel, before or after the transport is up.
    ///
    /// When not yet connected the registration is queued and materializes on
    /// the transition to connected; it is also replayed after every
    /// reconnect. Registering the same channel key again replaces the prior
    /// subscription. The handler runs on the session's read task and receives
    /// `(channel key, event)`.
    pub async fn subscribe<F>(&self, channel: &str, topic: &str, handler: F) -> Subscription
    where
        F: Fn(&str, StatusEvent) + Send + Sync + 'static,
    {
        let handler: Arc<EventHandler> = Arc::new(handler);
        self.registry
            .register(&self.connection, channel, topic, handler)
            .await;
        Subscription::new(channel.to_string(), self.clone())
    }

    /// Subscribes to extraction-job status events
    pub async fn subscribe_to_extractions<F>(&self, handler: F) -> Subscription
    where
        F: Fn(StatusEvent) + Send + Sync + 'static,
    {
        self.subscribe(channels::EXTRACTIONS, topics::EXTRACTIONS, move |_, event| {
            handler(event)
        })
        .await
    }

    /// Subscribes to migration-job status events
    pub async fn subscribe_to_migrations<F>(&self, handler: F) -> Subscription
    where
        F: Fn(StatusEvent) + Send + Sync + 'static,
    {
        self.subscribe(channels::MIGRATIONS, topics::MIGRATIONS, move |_, event| {
            handler(event)
        })
        .await
    }

    /// Subscribes to data-quality check status events
    pub async fn subscribe_to_data_quality<F>(&self, handler: F) -> Subscription
    where
        F: Fn(StatusEvent) + Send + Sync + 'static,
    {
        self.subscribe(
            channels::DATA_QUALITY,
            topics::DATA_QUALITY,
            move |_, event| handler(event),
        )
        .await
    }

    /// Registers a connection-status listener; the returned handle removes
    /// exactly this listener
    pub async fn add_status_listener<F>(&self, listener: F) -> StatusListenerHandle
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        let token = self.broadcaster.add_listener(listener).await;
        StatusListenerHandle::new(token, Arc::clone(&self.broadcaster))
    }

    pub(crate) async fn unsubscribe_channel(&self, channel: &str) {
        self.registry.remove(&self.connection, channel).await;
    }

    /// Set connection state; publishes to status listeners and the
    /// reconnection watcher only on an actual transition
    async fn set_state(&self, new_state: ConnectionState) {
        let previous = self.connection.state().await;
        if previous == new_state {
            return;
        }
        self.connection.set_state(new_state).await;

        {
            let state = self.state.read().await;
            state.notify_state_change(new_state, state.was_manual_disconnect);
        }

        let status = match new_state {
            ConnectionState::Connecting => ConnectionStatus::Connecting,
            ConnectionState::Connected => ConnectionStatus::Connected,
            ConnectionState::Disconnected => ConnectionStatus::Disconnected,
        };
        self.broadcaster.publish(status).await;
    }

    /// One full connection attempt: open transport, STOMP handshake, spawn
    /// the read and heartbeat tasks, replay subscriptions
    async fn try_connect_once(&self) -> Result<()> {
        self.set_state(ConnectionState::Connecting).await;

        let url = self.build_endpoint_url()?;
        tracing::info!("Connecting to {}", self.endpoint);

        let TransportHandle {
            outgoing,
            mut incoming,
        } = self.transport.connect(&url).await?;
        self.connection.set_writer(outgoing).await;

        let heartbeat_interval = self
            .options
            .heartbeat_interval
            .unwrap_or(HEARTBEAT_INTERVAL);
        let host = Url::parse(&self.endpoint)?
            .host_str()
            .unwrap_or("localhost")
            .to_string();
        self.connection
            .send_frame(&Frame::connect(&host, heartbeat_interval))
            .await?;

        let handshake_timeout = Duration::from_millis(
            self.options
                .handshake_timeout
                .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT),
        );
        let connected_frame = self.await_connected(&mut incoming, handshake_timeout).await?;

        let timings = negotiate_heartbeat(
            heartbeat_interval,
            connected_frame.header(stomp_headers::HEART_BEAT),
        );
        let last_activity = Arc::new(RwLock::new(Instant::now()));

        {
            let mut state = self.state.write().await;
            // a monitor left over from the previous connection holds a stale
            // activity clock and must not judge this one
            state.task_manager.abort_all();
            let client = self.clone();
            let activity_for_reader = Arc::clone(&last_activity);
            state.task_manager.spawn(async move {
                client.read_loop(incoming, activity_for_reader).await;
            });

            let monitor = HeartbeatMonitor::new(
                Arc::downgrade(&self.connection),
                timings,
                last_activity,
            );
            if !monitor.is_disabled() {
                state.task_manager.track(monitor.spawn());
            }
        }

        self.set_state(ConnectionState::Connected).await;
        self.backoff.lock().await.reset();

        // drain queued intents and re-establish everything registered
        self.registry.activate_all(&self.connection).await;
        tracing::info!(
            "Connected to status server, {} channel(s) active",
            self.registry.len().await
        );
        Ok(())
    }

    /// Waits for the server's CONNECTED frame, tolerating heartbeats
    async fn await_connected(
        &self,
        incoming: &mut mpsc::Receiver<String>,
        timeout: Duration,
    ) -> Result<Frame> {
        let deadline = Instant::now() + timeout;
        loop {
            let raw = tokio::time::timeout_at(deadline, incoming.recv())
                .await
                .map_err(|_| StatusError::Timeout)?
                .ok_or_else(|| {
                    StatusError::Connection("connection closed during handshake".to_string())
                })?;

            match Frame::parse(&raw)? {
                None => continue,
                Some(frame) if frame.command == FrameCommand::Connected => return Ok(frame),
                Some(frame) if frame.command == FrameCommand::Error => {
                    return Err(StatusError::Protocol(frame.error_detail()));
                }
                Some(frame) => {
                    return Err(StatusError::Protocol(format!(
                        "unexpected {} frame during handshake",
                        frame.command
                    )));
                }
            }
        }
    }

    /// Consumes inbound frames until the connection goes away
    async fn read_loop(
        self,
        mut incoming: mpsc::Receiver<String>,
        last_activity: Arc<RwLock<Instant>>,
    ) {
        while let Some(raw) = incoming.recv().await {
            *last_activity.write().await = Instant::now();
            match Frame::parse(&raw) {
                Ok(None) => tracing::trace!("Server heartbeat"),
                Ok(Some(frame)) => match frame.command {
                    FrameCommand::Message => self.dispatcher.dispatch(frame).await,
                    FrameCommand::Error => {
                        tracing::error!("Server error frame: {}", frame.error_detail());
                        break;
                    }
                    FrameCommand::Receipt => {
                        tracing::debug!("Receipt: {:?}", frame.header("receipt-id"));
                    }
                    other => tracing::debug!("Ignoring unexpected {} frame", other),
                },
                // local to this frame; the session stays up
                Err(e) => tracing::warn!("Dropping unparseable frame: {}", e),
            }
        }
        tracing::info!("Read task finished");
        self.handle_connection_loss().await;
    }

    /// Abrupt closure or protocol error on a live connection
    async fn handle_connection_loss(&self) {
        if self.state.read().await.was_manual_disconnect {
            return;
        }
        tracing::warn!("Connection to status server lost");
        self.connection.clear_writer().await;
        self.registry.deactivate_all().await;
        self.set_state(ConnectionState::Disconnected).await;
    }

    /// Failed connection attempt (transport open or handshake)
    async fn handle_attempt_failure(&self) {
        self.connection.clear_writer().await;
        self.set_state(ConnectionState::Disconnected).await;
    }

    /// Retry loop driven by the reconnection watcher; one failure is already
    /// on the books whenever this runs
    pub(crate) async fn try_reconnect(&self) {
        if self.state.read().await.was_manual_disconnect {
            tracing::info!("Manual disconnect detected, will not attempt to reconnect");
            return;
        }
        if self.backoff.lock().await.is_exhausted() {
            tracing::debug!("Retries exhausted, waiting for an explicit connect()");
            return;
        }

        loop {
            {
                let state = self.connection.state().await;
                if state != ConnectionState::Disconnected {
                    tracing::info!(
                        "Already connected or connecting, stopping reconnection attempts"
                    );
                    return;
                }
            }

            let delay = self.backoff.lock().await.next_delay();
            let Some(delay) = delay else {
                let attempts = self.backoff.lock().await.attempts();
                tracing::error!(
                    "Giving up after {} consecutive failed connection attempts",
                    attempts
                );
                self.broadcaster.publish(ConnectionStatus::Error).await;
                return;
            };

            tracing::info!("Reconnecting in {:?}", delay);
            tokio::time::sleep(delay).await;

            if self.state.read().await.was_manual_disconnect {
                tracing::info!("Disconnected while waiting to retry, stopping");
                return;
            }
            // a caller-initiated connect() may have landed during the sleep
            if self.connection.state().await != ConnectionState::Disconnected {
                tracing::info!("Session re-established while waiting to retry, stopping");
                return;
            }

            match self.try_connect_once().await {
                Ok(()) => {
                    tracing::info!("Reconnected successfully");
                    return;
                }
                Err(e) => {
                    tracing::error!("Reconnection attempt failed: {}", e);
                    self.handle_attempt_failure().await;
                }
            }
        }
    }

    /// Handshake URL with the externally supplied credential attached
    fn build_endpoint_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.endpoint)?;
        if let Some(token) = &self.options.access_token {
            url.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, token);
        }
        Ok(url.to_string())
    }
}

use crate::client::{ConnectionManager, StatusClient};
use crate::messaging::Frame;
use crate::types::StatusEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Caller-supplied handler invoked with (channel key, decoded event)
pub type EventHandler = dyn Fn(&str, StatusEvent) + Send + Sync;

struct RegisteredChannel {
    topic: String,
    handler: Arc<EventHandler>,
    /// Wire-level subscription id while a connection is up
    subscription_id: Option<String>,
}

/// Maps channel keys to topics and handlers, and keeps every registration
/// durable across reconnects.
///
/// Registrations made before the session is connected are recorded as pending
/// intents; the session manager drains them by calling [`activate_all`] the
/// moment it reaches the connected state. At most one wire subscription
/// exists per channel key: registering the same key again replaces the prior
/// subscription.
///
/// [`activate_all`]: SubscriptionRegistry::activate_all
pub struct SubscriptionRegistry {
    entries: RwLock<HashMap<String, RegisteredChannel>>,
    id_counter: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            id_counter: AtomicU64::new(0),
        }
    }

    fn next_subscription_id(&self) -> String {
        let n = self.id_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("sub-{}", n)
    }

    /// Records interest in a channel, replacing any prior registration for
    /// the same key. Subscribes on the wire immediately when connected.
    pub async fn register(
        &self,
        connection: &ConnectionManager,
        channel: &str,
        topic: &str,
        handler: Arc<EventHandler>,
    ) {
        let mut entries = self.entries.write().await;

        if let Some(prev) = entries.remove(channel) {
            if let Some(id) = prev.subscription_id {
                tracing::debug!("Replacing subscription for channel '{}'", channel);
                self.cancel_wire_subscription(connection, &id).await;
            }
        }

        let mut entry = RegisteredChannel {
            topic: topic.to_string(),
            handler,
            subscription_id: None,
        };

        if connection.is_connected().await {
            entry.subscription_id = self.open_wire_subscription(connection, topic).await;
        } else {
            tracing::debug!(
                "Not connected, queueing subscription for channel '{}'",
                channel
            );
        }

        entries.insert(channel.to_string(), entry);
    }

    /// Removes a channel registration and cancels its wire subscription
    pub async fn remove(&self, connection: &ConnectionManager, channel: &str) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.remove(channel) {
            if let Some(id) = entry.subscription_id {
                self.cancel_wire_subscription(connection, &id).await;
            }
            tracing::info!("Unsubscribed from channel '{}'", channel);
        }
    }

    /// (Re)establishes every registered channel; called on each transition to
    /// connected so pending and pre-loss subscriptions come back without
    /// caller involvement
    pub async fn activate_all(&self, connection: &ConnectionManager) {
        let mut entries = self.entries.write().await;
        for (channel, entry) in entries.iter_mut() {
            // already live on this connection, leave its handle alone
            if entry.subscription_id.is_some() {
                continue;
            }
            entry.subscription_id = self
                .open_wire_subscription(connection, &entry.topic)
                .await;
            if entry.subscription_id.is_some() {
                tracing::info!(
                    "Subscribed channel '{}' to topic {}",
                    channel,
                    entry.topic
                );
            }
        }
    }

    /// Invalidates all wire handles after connection loss; registrations stay
    pub async fn deactivate_all(&self) {
        let mut entries = self.entries.write().await;
        for entry in entries.values_mut() {
            entry.subscription_id = None;
        }
    }

    /// Cancels everything and forgets all registrations (session teardown)
    pub async fn clear(&self, connection: &ConnectionManager) {
        let mut entries = self.entries.write().await;
        for (_, entry) in entries.drain() {
            if let Some(id) = entry.subscription_id {
                self.cancel_wire_subscription(connection, &id).await;
            }
        }
    }

    /// Resolves an inbound MESSAGE frame to its channel key and handler,
    /// by subscription id first, destination topic as fallback
    pub async fn resolve(
        &self,
        subscription_id: Option<&str>,
        destination: Option<&str>,
    ) -> Option<(String, Arc<EventHandler>)> {
        let entries = self.entries.read().await;

        if let Some(id) = subscription_id {
            for (channel, entry) in entries.iter() {
                if entry.subscription_id.as_deref() == Some(id) {
                    return Some((channel.clone(), Arc::clone(&entry.handler)));
                }
            }
        }

        if let Some(topic) = destination {
            for (channel, entry) in entries.iter() {
                if entry.topic == topic {
                    return Some((channel.clone(), Arc::clone(&entry.handler)));
                }
            }
        }

        None
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn open_wire_subscription(
        &self,
        connection: &ConnectionManager,
        topic: &str,
    ) -> Option<String> {
        let id = self.next_subscription_id();
        match connection.send_frame(&Frame::subscribe(&id, topic)).await {
            Ok(()) => Some(id),
            Err(e) => {
                // stays pending; replayed on the next successful connect
                tracing::warn!("Failed to subscribe to {}: {}", topic, e);
                None
            }
        }
    }

    async fn cancel_wire_subscription(&self, connection: &ConnectionManager, id: &str) {
        if let Err(e) = connection.send_frame(&Frame::unsubscribe(id)).await {
            tracing::debug!("Failed to send UNSUBSCRIBE for {}: {}", id, e);
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one channel subscription; cancelling it removes exactly that
/// channel's registration.
pub struct Subscription {
    channel: String,
    client: StatusClient,
}

impl Subscription {
    pub(crate) fn new(channel: String, client: StatusClient) -> Self {
        Self { channel, client }
    }

    /// The channel key this subscription was registered under
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Cancels delivery for this channel
    pub async fn unsubscribe(self) {
        self.client.unsubscribe_channel(&self.channel).await;
    }
}

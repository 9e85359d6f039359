use super::Frame;
use crate::channel::SubscriptionRegistry;
use crate::types::constants::stomp_headers;
use crate::types::StatusEvent;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Turns inbound MESSAGE frames into typed events and routes each one to
/// exactly one channel handler.
///
/// Failure is local to the frame: undecodable bodies are logged and dropped,
/// and a panicking handler is caught so one misbehaving consumer cannot take
/// the session down or starve other channels.
pub struct EventDispatcher {
    registry: Arc<SubscriptionRegistry>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn dispatch(&self, frame: Frame) {
        let subscription = frame.header(stomp_headers::SUBSCRIPTION);
        let destination = frame.header(stomp_headers::DESTINATION);

        let Some((channel, handler)) = self.registry.resolve(subscription, destination).await
        else {
            tracing::debug!(
                "Dropping message for unknown subscription (id={:?}, destination={:?})",
                subscription,
                destination
            );
            return;
        };

        let event: StatusEvent = match serde_json::from_str(&frame.body) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    "Dropping undecodable status event on channel '{}': {}",
                    channel,
                    e
                );
                return;
            }
        };

        tracing::debug!(
            "Dispatching {} event to channel '{}'",
            event.event_type,
            channel
        );
        if catch_unwind(AssertUnwindSafe(|| handler(&channel, event))).is_err() {
            tracing::error!("Handler for channel '{}' panicked", channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ConnectionManager, ConnectionState};
    use crate::messaging::FrameCommand;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    async fn registry_with(
        channels: &[(&str, &str)],
    ) -> (Arc<SubscriptionRegistry>, Arc<Mutex<Vec<(String, StatusEvent)>>>) {
        let conn = ConnectionManager::new();
        let (tx, _rx) = mpsc::channel(64);
        conn.set_writer(tx).await;
        conn.set_state(ConnectionState::Connected).await;

        let registry = Arc::new(SubscriptionRegistry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        for (channel, topic) in channels {
            let seen_in_handler = Arc::clone(&seen);
            registry
                .register(
                    &conn,
                    channel,
                    topic,
                    Arc::new(move |key: &str, event: StatusEvent| {
                        seen_in_handler
                            .lock()
                            .unwrap()
                            .push((key.to_string(), event));
                    }),
                )
                .await;
        }
        (registry, seen)
    }

    fn message_frame(subscription: &str, destination: &str, body: &str) -> Frame {
        Frame::new(FrameCommand::Message)
            .with_header(stomp_headers::SUBSCRIPTION, subscription)
            .with_header(stomp_headers::DESTINATION, destination)
            .with_body(body)
    }

    #[tokio::test]
    async fn test_dispatches_decoded_event_to_channel_handler() {
        let (registry, seen) = registry_with(&[("extractions", "/topic/extractions")]).await;
        let dispatcher = EventDispatcher::new(registry);

        let body = r#"{"eventType":"status","entityType":"EXTRACTION","entityId":"42","status":"RUNNING","timestamp":"2025-01-01T00:00:00Z"}"#;
        dispatcher
            .dispatch(message_frame("sub-1", "/topic/extractions", body))
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "extractions");
        assert_eq!(seen[0].1.entity_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_malformed_body_does_not_affect_other_channels() {
        let (registry, seen) = registry_with(&[
            ("extractions", "/topic/extractions"),
            ("migrations", "/topic/migrations"),
        ])
        .await;
        let dispatcher = EventDispatcher::new(registry);

        dispatcher
            .dispatch(message_frame("sub-2", "/topic/migrations", "{{not json"))
            .await;
        dispatcher
            .dispatch(message_frame(
                "sub-1",
                "/topic/extractions",
                r#"{"eventType":"status","timestamp":"2025-01-01T00:00:00Z"}"#,
            ))
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "extractions");
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let conn = ConnectionManager::new();
        let (tx, _rx) = mpsc::channel(8);
        conn.set_writer(tx).await;
        conn.set_state(ConnectionState::Connected).await;

        let registry = Arc::new(SubscriptionRegistry::new());
        registry
            .register(
                &conn,
                "extractions",
                "/topic/extractions",
                Arc::new(|_: &str, _: StatusEvent| panic!("consumer bug")),
            )
            .await;
        let dispatcher = EventDispatcher::new(registry);

        // must not unwind out of the dispatch path
        dispatcher
            .dispatch(message_frame(
                "sub-1",
                "/topic/extractions",
                r#"{"eventType":"status","timestamp":"2025-01-01T00:00:00Z"}"#,
            ))
            .await;
    }

    #[tokio::test]
    async fn test_unknown_subscription_is_dropped() {
        let (registry, seen) = registry_with(&[("extractions", "/topic/extractions")]).await;
        let dispatcher = EventDispatcher::new(registry);

        dispatcher
            .dispatch(message_frame(
                "sub-9",
                "/topic/somewhere-else",
                r#"{"eventType":"status","timestamp":"2025-01-01T00:00:00Z"}"#,
            ))
            .await;
        assert!(seen.lock().unwrap().is_empty());
    }
}

use crate::client::ConnectionManager;
use crate::messaging::frame::{Frame, HeartbeatTimings};
use crate::types::constants::HEARTBEAT_GRACE_FACTOR;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Keeps the session alive in both directions: emits client heartbeats at the
/// negotiated send interval and watches inbound activity against the expect
/// interval. Sustained inbound silence closes the write side, which surfaces
/// to the session manager as an abrupt closure.
pub struct HeartbeatMonitor {
    timings: HeartbeatTimings,
    connection: Weak<ConnectionManager>,
    last_activity: Arc<RwLock<Instant>>,
}

impl HeartbeatMonitor {
    pub fn new(
        connection: Weak<ConnectionManager>,
        timings: HeartbeatTimings,
        last_activity: Arc<RwLock<Instant>>,
    ) -> Self {
        Self {
            timings,
            connection,
            last_activity,
        }
    }

    /// True when neither direction negotiated heartbeats
    pub fn is_disabled(&self) -> bool {
        self.timings.send_interval == 0 && self.timings.expect_interval == 0
    }

    fn tick_period(&self) -> Duration {
        let ms = match (self.timings.send_interval, self.timings.expect_interval) {
            (0, expect) => expect,
            (send, 0) => send,
            (send, expect) => send.min(expect),
        };
        Duration::from_millis(ms)
    }

    /// Spawns the heartbeat task that runs until the connection goes away
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = time::interval(self.tick_period());
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            // first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;

                let connection = match self.connection.upgrade() {
                    Some(conn) => conn,
                    None => break,
                };
                if !connection.is_connected().await {
                    break;
                }

                if self.timings.expect_interval > 0 {
                    let silence = self.last_activity.read().await.elapsed();
                    let tolerated = Duration::from_millis(
                        self.timings.expect_interval * u64::from(HEARTBEAT_GRACE_FACTOR),
                    );
                    if silence > tolerated {
                        tracing::warn!(
                            "No server activity for {:?}, treating connection as lost",
                            silence
                        );
                        connection.clear_writer().await;
                        break;
                    }
                }

                if self.timings.send_interval > 0 {
                    if let Err(e) = connection.send_raw(Frame::heartbeat()).await {
                        tracing::debug!("Heartbeat send failed, stopping monitor: {}", e);
                        break;
                    }
                    tracing::trace!("Sent heartbeat");
                }
            }
            tracing::debug!("Heartbeat monitor finished");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ConnectionState;
    use tokio::sync::mpsc;

    fn timings(send: u64, expect: u64) -> HeartbeatTimings {
        HeartbeatTimings {
            send_interval: send,
            expect_interval: expect,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_emits_heartbeats_at_send_interval() {
        let conn = Arc::new(ConnectionManager::new());
        let (tx, mut rx) = mpsc::channel(16);
        conn.set_writer(tx).await;
        conn.set_state(ConnectionState::Connected).await;

        let last_activity = Arc::new(RwLock::new(Instant::now()));
        let monitor = HeartbeatMonitor::new(Arc::downgrade(&conn), timings(4000, 0), last_activity);
        let handle = monitor.spawn();

        tokio::time::sleep(Duration::from_millis(4100)).await;
        assert_eq!(rx.try_recv().unwrap(), "\n");
        tokio::time::sleep(Duration::from_millis(4000)).await;
        assert_eq!(rx.try_recv().unwrap(), "\n");
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_inbound_silence_drops_writer() {
        let conn = Arc::new(ConnectionManager::new());
        let (tx, _rx) = mpsc::channel(16);
        conn.set_writer(tx).await;
        conn.set_state(ConnectionState::Connected).await;

        let last_activity = Arc::new(RwLock::new(Instant::now()));
        let monitor =
            HeartbeatMonitor::new(Arc::downgrade(&conn), timings(0, 4000), last_activity);
        let handle = monitor.spawn();

        // beyond 3x expect interval with no recorded activity
        tokio::time::sleep(Duration::from_millis(17_000)).await;
        let _ = handle.await;
        assert!(conn.send_raw("\n".to_string()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recent_activity_keeps_connection_alive() {
        let conn = Arc::new(ConnectionManager::new());
        let (tx, mut rx) = mpsc::channel(64);
        conn.set_writer(tx).await;
        conn.set_state(ConnectionState::Connected).await;

        let last_activity = Arc::new(RwLock::new(Instant::now()));
        let monitor = HeartbeatMonitor::new(
            Arc::downgrade(&conn),
            timings(4000, 4000),
            Arc::clone(&last_activity),
        );
        let handle = monitor.spawn();

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(4000)).await;
            *last_activity.write().await = Instant::now();
        }
        // still sending heartbeats, writer intact
        assert!(rx.try_recv().is_ok());
        assert!(conn.send_raw("\n".to_string()).await.is_ok());
        handle.abort();
    }
}

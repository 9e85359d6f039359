use crate::messaging::Frame;
use crate::types::{Result, StatusError};
use tokio::sync::{mpsc, RwLock};

/// Connection lifecycle states. Mutated only by the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Owns the write side of the one transport connection and the connection
/// state. Exactly one of these exists per client instance.
pub struct ConnectionManager {
    outgoing: RwLock<Option<mpsc::Sender<String>>>,
    state: RwLock<ConnectionState>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            outgoing: RwLock::new(None),
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }

    /// Sets the outgoing frame sender (called after a transport opens)
    pub async fn set_writer(&self, writer: mpsc::Sender<String>) {
        let mut outgoing = self.outgoing.write().await;
        *outgoing = Some(writer);
    }

    /// Drops the writer; the transport's write pump shuts down when the
    /// sender side goes away
    pub async fn clear_writer(&self) {
        let mut outgoing = self.outgoing.write().await;
        *outgoing = None;
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn set_state(&self, new_state: ConnectionState) {
        let mut state = self.state.write().await;
        *state = new_state;
    }

    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// Serializes and sends a frame over the transport
    pub async fn send_frame(&self, frame: &Frame) -> Result<()> {
        self.send_raw(frame.serialize()).await
    }

    /// Sends a raw wire payload (frame text or heartbeat newline)
    pub async fn send_raw(&self, payload: String) -> Result<()> {
        let outgoing = self.outgoing.read().await;
        let tx = outgoing.as_ref().ok_or(StatusError::NotConnected)?;
        tx.send(payload)
            .await
            .map_err(|_| StatusError::Connection("transport write channel closed".to_string()))
    }

}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

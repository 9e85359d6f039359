pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

use crate::types::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub use websocket::WebSocketTransport;

/// An open transport connection, seen as a pair of text-frame channels.
///
/// `outgoing` carries client frames to the server; dropping it closes the
/// connection. `incoming` yields server frames and ends when the connection
/// is lost, however that happens.
pub struct TransportHandle {
    pub outgoing: mpsc::Sender<String>,
    pub incoming: mpsc::Receiver<String>,
}

/// The seam between the session manager and the underlying streaming
/// transport. The shipped implementation is websocket; polling-style fallback
/// transports would implement the same trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a connection to the given endpoint URL
    async fn connect(&self, endpoint: &str) -> Result<TransportHandle>;
}

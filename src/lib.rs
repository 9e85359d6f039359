//! # OpsBoard Realtime
//!
//! A realtime status client for the OpsBoard data-operations dashboard
//! (STOMP 1.2 over WebSocket).
//!
//! The client maintains a single multiplexed pub/sub session to the status
//! server and fans inbound job events (extractions, migrations, data-quality
//! runs) out to per-channel handlers. Connection loss is handled internally:
//! subscriptions survive reconnects, retries back off exponentially, and
//! connection-state transitions are broadcast to status listeners so a UI can
//! render a live indicator.
//!
//! ## Example
//!
//! ```no_run
//! use opsboard_realtime::{StatusClient, StatusClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = StatusClient::new(
//!         "wss://opsboard.example.com/ws/status",
//!         StatusClientOptions {
//!             access_token: Some("jwt-from-login".to_string()),
//!             ..Default::default()
//!         },
//!     )?;
//!
//!     let _extractions = client
//!         .subscribe_to_extractions(|event| {
//!             println!("{:?} -> {:?}", event.entity_id, event.status);
//!         })
//!         .await;
//!
//!     client.connect().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod status;
pub mod transport;
pub mod types;

pub use channel::Subscription;
pub use client::{ConnectionState, StatusClient, StatusClientBuilder, StatusClientOptions};
pub use messaging::{Frame, FrameCommand};
pub use status::{ConnectionStatus, StatusListenerHandle};
pub use transport::{Transport, TransportHandle};
pub use types::{Result, StatusError, StatusEvent};

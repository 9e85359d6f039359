pub mod builder;
pub mod connection;
pub mod core;
pub mod state;

pub use builder::{StatusClientBuilder, StatusClientOptions};
pub use connection::{ConnectionManager, ConnectionState};
pub use core::StatusClient;
pub use state::ClientState;

pub mod broadcaster;

pub use broadcaster::{ConnectionStatus, StatusBroadcaster, StatusListenerHandle};

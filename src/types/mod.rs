pub mod constants;
pub mod error;
pub mod event;

pub use error::{Result, StatusError};
pub use event::StatusEvent;

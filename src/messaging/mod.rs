pub mod dispatcher;
pub mod frame;

pub use dispatcher::EventDispatcher;
pub use frame::{Frame, FrameCommand};

pub mod backoff;
pub mod heartbeat;
pub mod task_manager;

pub use backoff::Backoff;
pub use heartbeat::HeartbeatMonitor;
pub use task_manager::TaskManager;

pub mod registry;

pub use registry::{EventHandler, Subscription, SubscriptionRegistry};

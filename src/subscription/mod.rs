//! Subscription groups: HTTP-established, WebSocket-delivered event streams.

mod group;
mod manager;
mod receiver;

pub use group::SubscriptionGroup;
pub use manager::SubscriptionManager;
pub use receiver::{ReceiveOutcome, ShutdownHandle, SubscriptionReceiver};

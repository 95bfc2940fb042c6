//! Client library for Robot Web Services (RWS), the HTTP/WebSocket control
//! interface exposed by ABB robot controllers.
//!
//! [`client::Client`] drives the request/response surface (controller state,
//! I/O signals, motion targets, file transfer, RAPID execution, user
//! registration, mastership). [`subscription`] layers an event stream on top
//! of the same session: [`subscription::SubscriptionManager::open`] (reached
//! through [`client::Client::subscribe`]) establishes a group over HTTP, and
//! [`subscription::SubscriptionReceiver`] polls its WebSocket and dispatches
//! typed events to an [`events::OnSubscriptionEvent`] implementation.

mod catalog;
mod client;
mod config;
mod error;
mod events;
mod result;
mod retry;
mod subscription;
mod transport;

pub use catalog::{
    CFGDomain, ControllerState, Coordinate, FileResource, IOSignalResource, OperationMode,
    ProtocolVersion, RAPIDExecutionState, RAPIDResource, RAPIDRunMode, RAPIDTaskExecutionState,
    SubscribedResource, SubscriptionPriority,
};
pub use client::{
    Client, MastershipDomain, JointTarget, RobTarget, DEFAULT_USERNAME, EXTERNAL_APPLICATION,
    EXTERNAL_LOCATION,
};
pub use config::{ClientConfig, ClientConfigBuilder, ClientUserToken};
pub use error::{Error, ProtocolErrorDetail, Result};
pub use events::{
    ControllerStateEvent, IOSignalStateEvent, OnSubscriptionEvent, OperationModeEvent,
    RAPIDExecutionStateEvent, SubscriptionCallbacks, SubscriptionEvent,
};
pub use result::Response;
pub use retry::{DefaultRetryPolicy, ExponentialBackoff, NoRetry, RequestRetryPolicy, RetryPolicyConfig};
pub use subscription::{ReceiveOutcome, ShutdownHandle, SubscriptionGroup, SubscriptionManager, SubscriptionReceiver};

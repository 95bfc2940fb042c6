use std::sync::Arc;

use crate::catalog::{ProtocolVersion, SubscribedResource};
use crate::error::{Error, Result};
use crate::transport::Transport;

use super::group::SubscriptionGroup;

const SUBSCRIPTION_PATH: &str = "/subscription";
const LOCATION_POLL_MARKER: &str = "/poll/";

/// Opens subscription groups against a controller.
///
/// Kept separate from [`crate::client::Client`] because opening a group is
/// the one RWS operation whose request body depends on the protocol
/// version, and isolating that here keeps the version branch out of the
/// request plumbing everything else shares.
pub struct SubscriptionManager {
    transport: Arc<Transport>,
    version: ProtocolVersion,
}

impl SubscriptionManager {
    pub(crate) fn new(transport: Arc<Transport>, version: ProtocolVersion) -> Self {
        Self { transport, version }
    }

    /// Open a subscription group over `resources`. The group is immediately
    /// live on the controller; events start queuing before a
    /// [`crate::subscription::receiver::SubscriptionReceiver`] ever connects.
    pub async fn open(&self, resources: &[SubscribedResource]) -> Result<SubscriptionGroup> {
        if resources.is_empty() {
            return Err(Error::invalid_argument(
                "subscription group must name at least one resource",
            ));
        }

        let body = encode_subscription_body(resources);
        let content_type = self.version.subscription_content_type();
        let response = self
            .transport
            .post(SUBSCRIPTION_PATH, Some((body.into_bytes(), content_type)))
            .await?;

        if response.status != 201 {
            return Err(Error::protocol(
                "unable to create subscription group",
                "POST",
                SUBSCRIPTION_PATH,
                response.status,
                response.reason.clone(),
                None,
                Some(String::from_utf8_lossy(&response.body).to_string()),
            ));
        }

        let location = response
            .header("location")
            .ok_or_else(|| Error::protocol_simple("cannot get subscription group from HTTP response"))?;

        let id = location
            .find(LOCATION_POLL_MARKER)
            .map(|start| location[start + LOCATION_POLL_MARKER.len()..].to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::protocol_simple("cannot get subscription group from HTTP response"))?;

        Ok(SubscriptionGroup::new(id, self.version, self.transport.clone()))
    }
}

/// Encode the subscription body both protocol versions share: each resource
/// `i` contributes its own `resources=i` marker followed by `i=<uri>` and
/// `i-p=<priority>`, in that order.
fn encode_subscription_body(resources: &[SubscribedResource]) -> String {
    let mut parts = Vec::with_capacity(resources.len() * 3);
    for (i, resource) in resources.iter().enumerate() {
        parts.push(format!("resources={i}"));
        parts.push(format!("{i}={}", resource.uri()));
        parts.push(format!("{i}-p={}", resource.priority().wire_value()));
    }
    parts.join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IOSignalResource, SubscriptionPriority};

    #[test]
    fn encodes_single_resource() {
        let resources = vec![SubscribedResource::IOSignal(
            IOSignalResource::new("DO_1"),
            SubscriptionPriority::Medium,
        )];
        let body = encode_subscription_body(&resources);
        assert_eq!(body, "resources=0&0=/rw/iosystem/signals/DO_1;state&0-p=1");
    }

    #[test]
    fn encodes_multiple_resources_in_order() {
        let resources = vec![
            SubscribedResource::IOSignal(IOSignalResource::new("A"), SubscriptionPriority::Low),
            SubscribedResource::RAPIDExecutionState(SubscriptionPriority::High),
        ];
        let body = encode_subscription_body(&resources);
        assert_eq!(
            body,
            "resources=0&0=/rw/iosystem/signals/A;state&0-p=0&resources=1&1=/rw/rapid/execution;ctrlexecstate&1-p=2"
        );
    }
}

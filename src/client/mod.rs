//! The Protocol Client: typed RWS operations built on top of the transport,
//! result decoder, and resource catalog.

mod files;
mod io;
mod motion;
mod panel;
mod rapid;
mod users;

pub use motion::{JointTarget, RobTarget};
pub use users::{DEFAULT_USERNAME, EXTERNAL_APPLICATION, EXTERNAL_LOCATION};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use url::Position;

use crate::catalog::{ProtocolVersion, SubscribedResource};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::result::{self, Response};
use crate::retry::RequestRetryPolicy;
use crate::subscription::{SubscriptionGroup, SubscriptionManager, SubscriptionReceiver};
use crate::transport::{RawResponse, Transport};

/// Redirect hops a single request will chase before giving up.
const MAX_REDIRECTS: u8 = 5;

#[allow(unused)]
macro_rules! client_debug {
    ($client: expr, $($arg:tt)*) => {
        log::debug!("rws:{} {}", $client.transport.base_url(), format!($($arg)*));
    }
}
#[allow(unused)]
use client_debug;

#[allow(unused)]
macro_rules! client_warn {
    ($client: expr, $($arg:tt)*) => {
        log::warn!("rws:{} {}", $client.transport.base_url(), format!($($arg)*));
    }
}
#[allow(unused)]
use client_warn;

#[allow(unused)]
macro_rules! client_error {
    ($client: expr, $($arg:tt)*) => {
        log::error!("rws:{} {}", $client.transport.base_url(), format!($($arg)*));
    }
}
#[allow(unused)]
use client_error;

/// A session-oriented client for one controller.
///
/// Owns the HTTP [`Transport`] and the mastership counters; a subscription
/// opened via [`Client::subscribe`] borrows the same transport so its
/// WebSocket upgrade carries this session's cookies.
pub struct Client {
    transport: Arc<Transport>,
    version: ProtocolVersion,
    mastership: Mutex<HashMap<&'static str, u32>>,
    subscription_ping_pong_timeout: Duration,
}

/// The controller subsystem a mastership lock is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MastershipDomain {
    Motion,
    Rapid,
    Config,
}

impl MastershipDomain {
    fn key(self) -> &'static str {
        match self {
            MastershipDomain::Motion => "motion",
            MastershipDomain::Rapid => "rapid",
            MastershipDomain::Config => "config",
        }
    }

    fn request_path(self) -> &'static str {
        match self {
            MastershipDomain::Motion => "/rw/motionsystem/mastership?action=request",
            MastershipDomain::Rapid => "/rw/rapid/mastership?action=request",
            MastershipDomain::Config => "/rw/cfg/mastership?action=request",
        }
    }

    fn release_path(self) -> &'static str {
        match self {
            MastershipDomain::Motion => "/rw/motionsystem/mastership?action=release",
            MastershipDomain::Rapid => "/rw/rapid/mastership?action=release",
            MastershipDomain::Config => "/rw/cfg/mastership?action=release",
        }
    }
}

impl Client {
    /// Connect to the controller described by `config` and establish a
    /// session. The first request the transport sends draws the digest
    /// challenge and authenticates; there is no separate RWS "login" call.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(Transport::new(
            config.base_url.clone(),
            config.user_token.user.clone(),
            config.user_token.password.clone(),
            config.request_timeout,
            config.verify_server_certs,
        )?);

        let client = Self {
            transport,
            version: ProtocolVersion::V2,
            mastership: Mutex::new(HashMap::new()),
            subscription_ping_pong_timeout: config.subscription_ping_pong_timeout,
        };

        // Any authenticated request establishes the session; the controller
        // state is the cheapest one that exists on every controller. Retried
        // on the configured connect policy since a fresh controller's TLS
        // listener can take a moment to come up after a reboot.
        let mut retry = config.retry_policy.to_policy();
        loop {
            match client.get_controller_state().await {
                Ok(_) => break,
                Err(e) => match retry.next_delay() {
                    Some(delay) => {
                        client_warn!(client, "initial connection attempt failed ({e}), retrying");
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
            }
        }
        client_debug!(client, "session established");
        Ok(client)
    }

    /// Build a client that speaks RWS 1.0 rather than the 2.0 default.
    pub async fn connect_v1(config: ClientConfig) -> Result<Self> {
        let mut client = Self::connect(config).await?;
        client.version = ProtocolVersion::V1;
        Ok(client)
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    /// Change the per-request timeout. Resets the underlying HTTP session,
    /// but not the cookies or digest state already negotiated.
    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        self.transport.set_timeout(timeout)
    }

    /// Log out the current session explicitly. `Client`'s `Drop` impl makes
    /// a best-effort attempt to do this too, but errors there are only
    /// logged: call this directly if you need to observe or propagate the
    /// result.
    pub async fn logout(&self) -> Result<()> {
        self.transport.get("/logout").await?;
        Ok(())
    }

    /// Open a subscription group over `resources`.
    pub async fn subscribe(&self, resources: &[SubscribedResource]) -> Result<SubscriptionGroup> {
        SubscriptionManager::new(self.transport.clone(), self.version)
            .open(resources)
            .await
    }

    /// Upgrade `group`'s poll endpoint to a WebSocket and start receiving its
    /// events, using this client's configured heartbeat timeout.
    pub async fn receive(&self, group: &SubscriptionGroup) -> Result<SubscriptionReceiver> {
        SubscriptionReceiver::connect(&self.transport, group, self.subscription_ping_pong_timeout).await
    }

    /// Acquire the mastership lock for `domain`. Issues the request only if
    /// this client did not already hold it; otherwise just increments the
    /// local count.
    pub async fn request_mastership(&self, domain: MastershipDomain) -> Result<()> {
        let already_held = {
            let mut counts = self.mastership.lock();
            let count = counts.entry(domain.key()).or_insert(0);
            let already_held = *count > 0;
            *count += 1;
            already_held
        };
        if already_held {
            return Ok(());
        }
        if let Err(e) = self.transport.post(domain.request_path(), None).await {
            let mut counts = self.mastership.lock();
            if let Some(count) = counts.get_mut(domain.key()) {
                *count -= 1;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Release the mastership lock for `domain`. Issues the request only
    /// when the local count drops to zero. Releasing past zero is a logic
    /// error and never reaches the network.
    pub async fn release_mastership(&self, domain: MastershipDomain) -> Result<()> {
        let should_release = {
            let mut counts = self.mastership.lock();
            let count = counts.entry(domain.key()).or_insert(0);
            if *count == 0 {
                return Err(Error::logic(format!(
                    "mastership for {:?} released more times than it was requested",
                    domain
                )));
            }
            *count -= 1;
            *count == 0
        };
        if should_release {
            self.transport.post(domain.release_path(), None).await?;
        }
        Ok(())
    }

    pub(crate) async fn decode_get(&self, path: &str) -> Result<Response> {
        let mut path = path.to_string();
        for _ in 0..MAX_REDIRECTS {
            let raw = self.transport.get(&path).await?;
            match self.same_host_redirect_target(&raw)? {
                Some(next) => path = next,
                None => return result::decode(raw),
            }
        }
        Err(Error::protocol_simple("too many redirects"))
    }

    pub(crate) async fn decode_post(&self, path: &str, body: Option<(Vec<u8>, &str)>) -> Result<Response> {
        let mut path = path.to_string();
        for _ in 0..MAX_REDIRECTS {
            let raw = self.transport.post(&path, body.clone()).await?;
            match self.same_host_redirect_target(&raw)? {
                Some(next) => path = next,
                None => return result::decode(raw),
            }
        }
        Err(Error::protocol_simple("too many redirects"))
    }

    pub(crate) async fn decode_put(&self, path: &str, body: Option<(Vec<u8>, &str)>) -> Result<Response> {
        let mut path = path.to_string();
        for _ in 0..MAX_REDIRECTS {
            let raw = self.transport.put(&path, body.clone()).await?;
            match self.same_host_redirect_target(&raw)? {
                Some(next) => path = next,
                None => return result::decode(raw),
            }
        }
        Err(Error::protocol_simple("too many redirects"))
    }

    pub(crate) async fn decode_delete(&self, path: &str) -> Result<Response> {
        let mut path = path.to_string();
        for _ in 0..MAX_REDIRECTS {
            let raw = self.transport.delete(&path).await?;
            match self.same_host_redirect_target(&raw)? {
                Some(next) => path = next,
                None => return result::decode(raw),
            }
        }
        Err(Error::protocol_simple("too many redirects"))
    }

    /// If `raw` is a redirect to a path on the same host as this client's
    /// transport, the path (with query) to follow next. Cross-host redirects
    /// are left for [`result::decode`] to turn into an [`Error::Protocol`].
    fn same_host_redirect_target(&self, raw: &RawResponse) -> Result<Option<String>> {
        if !result::is_redirect(raw.status) {
            return Ok(None);
        }
        let Some(location) = raw.header("location") else {
            return Ok(None);
        };
        let base = self.transport.base_url();
        let target = base
            .join(location)
            .map_err(|e| Error::protocol_simple(format!("invalid redirect location {location:?}: {e}")))?;
        if target.host_str() != base.host_str() || target.port_or_known_default() != base.port_or_known_default() {
            return Ok(None);
        }
        Ok(Some(target[Position::AfterPort..].to_string()))
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let transport = self.transport.clone();
        handle.spawn(async move {
            if let Err(e) = transport.get("/logout").await {
                log::warn!("rws:{} logout on drop failed: {e}", transport.base_url());
            }
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use url::Url;

    fn test_transport() -> Arc<Transport> {
        Arc::new(
            Transport::new(
                Url::parse("http://localhost/").unwrap(),
                "u",
                "p",
                Duration::from_secs(1),
                false,
            )
            .unwrap(),
        )
    }

    /// A `Client` wired to an unreachable transport, for tests that exercise
    /// argument validation without ever making a network call.
    pub(crate) fn test_client() -> Client {
        Client {
            transport: test_transport(),
            version: ProtocolVersion::V2,
            mastership: Mutex::new(HashMap::new()),
            subscription_ping_pong_timeout: Duration::from_secs(120),
        }
    }

    #[test]
    fn mastership_keys_are_distinct() {
        assert_ne!(MastershipDomain::Motion.key(), MastershipDomain::Rapid.key());
        assert_ne!(MastershipDomain::Rapid.key(), MastershipDomain::Config.key());
    }

    #[tokio::test]
    async fn release_without_request_is_logic_error() {
        let client = test_client();
        let err = client.release_mastership(MastershipDomain::Motion).await.unwrap_err();
        assert!(matches!(err, Error::Logic(_)));
    }

    fn client_against(transport: Arc<Transport>) -> Client {
        Client {
            transport,
            version: ProtocolVersion::V2,
            mastership: Mutex::new(HashMap::new()),
            subscription_ping_pong_timeout: Duration::from_secs(120),
        }
    }

    #[tokio::test]
    async fn decode_get_follows_same_host_redirect() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let responses = [
                format!(
                    "HTTP/1.1 302 Found\r\nlocation: http://{addr}/rw/panel/ctrlstate\r\ncontent-length: 0\r\n\r\n"
                ),
                "HTTP/1.1 200 OK\r\ncontent-length: 7\r\n\r\n<html/>".to_string(),
            ];
            for body in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 1024];
                let _ = socket.read(&mut buf).await.unwrap();
                socket.write_all(body.as_bytes()).await.unwrap();
            }
        });

        let transport = Arc::new(
            Transport::new(
                Url::parse(&format!("http://{addr}/")).unwrap(),
                "u",
                "p",
                Duration::from_secs(1),
                false,
            )
            .unwrap(),
        );
        let client = client_against(transport);

        let response = client.decode_get("/rw/panel/oldstate").await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn decode_get_does_not_follow_cross_host_redirect() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            let body = "HTTP/1.1 302 Found\r\nlocation: http://example.invalid/elsewhere\r\ncontent-length: 0\r\n\r\n";
            socket.write_all(body.as_bytes()).await.unwrap();
        });

        let transport = Arc::new(
            Transport::new(
                Url::parse(&format!("http://{addr}/")).unwrap(),
                "u",
                "p",
                Duration::from_secs(1),
                false,
            )
            .unwrap(),
        );
        let client = client_against(transport);

        let err = client.decode_get("/rw/panel/oldstate").await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}

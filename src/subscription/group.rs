use std::sync::Arc;

use crate::catalog::ProtocolVersion;
use crate::error::Result;
use crate::transport::Transport;

/// Lifecycle state of a [`SubscriptionGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Closed,
    Detached,
}

/// A subscription group open on the controller: an HTTP resource at
/// `/subscription/{id}` that a [`crate::subscription::receiver::SubscriptionReceiver`]
/// polls over WebSocket at `/poll/{id}`.
///
/// Dropping an open group issues a best-effort `DELETE /subscription/{id}`
/// on whatever Tokio runtime is current, the same fire-and-forget pattern
/// [`crate::client::Client`] uses for its own logout-on-drop. Call
/// [`SubscriptionGroup::close`] explicitly to observe the result, or
/// [`SubscriptionGroup::detach`] to deliberately leak the subscription and
/// let the controller's own idle timeout reclaim it.
pub struct SubscriptionGroup {
    id: String,
    version: ProtocolVersion,
    transport: Arc<Transport>,
    state: State,
}

impl SubscriptionGroup {
    pub(crate) fn new(id: String, version: ProtocolVersion, transport: Arc<Transport>) -> Self {
        Self {
            id,
            version,
            transport,
            state: State::Open,
        }
    }

    /// The group id assigned by the controller, as extracted from the
    /// `Location` header of the `POST /subscription` response.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    /// `/poll/{id}`, the path a receiver upgrades to WebSocket.
    pub fn poll_path(&self) -> String {
        format!("/poll/{}", self.id)
    }

    fn is_open(&self) -> bool {
        self.state == State::Open
    }

    /// Unsubscribe from events and release the group on the controller.
    ///
    /// A no-op if the group is already closed or detached. This corrects a
    /// bug present in the RWS 2.0 implementation this client is modeled on,
    /// where `close` referenced a variable that was never the group's id and
    /// so never actually issued the `DELETE` or cleared its state; here both
    /// protocol versions close identically.
    pub async fn close(&mut self) -> Result<()> {
        if !self.is_open() {
            return Ok(());
        }
        self.transport
            .delete(&format!("/subscription/{}", self.id))
            .await?;
        self.state = State::Closed;
        Ok(())
    }

    /// Forget about this group without closing it on the controller. The
    /// subscription remains open server-side until its own idle timeout.
    pub fn detach(&mut self) {
        self.state = State::Detached;
    }
}

impl Drop for SubscriptionGroup {
    fn drop(&mut self) {
        if !self.is_open() {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let transport = self.transport.clone();
        let id = self.id.clone();
        handle.spawn(async move {
            if let Err(e) = transport.delete(&format!("/subscription/{id}")).await {
                log::warn!("rws:{} subscription {id} close on drop failed: {e}", transport.base_url());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;

    fn transport() -> Arc<Transport> {
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

    #[test]
    fn poll_path_uses_group_id() {
        let g = SubscriptionGroup::new("7".to_string(), ProtocolVersion::V1, transport());
        assert_eq!(g.poll_path(), "/poll/7");
    }

    #[test]
    fn detach_marks_not_open() {
        let mut g = SubscriptionGroup::new("7".to_string(), ProtocolVersion::V2, transport());
        assert!(g.is_open());
        g.detach();
        assert!(!g.is_open());
    }

    #[tokio::test]
    async fn drop_while_open_issues_delete() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 1024];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                .await;
            let _ = tx.send(request);
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
        {
            let _group = SubscriptionGroup::new("abc123".to_string(), ProtocolVersion::V2, transport);
        }

        let request = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("drop did not issue a request in time")
            .unwrap();
        assert!(request.starts_with("DELETE /subscription/abc123"));
    }

    #[tokio::test]
    async fn drop_after_close_issues_no_second_delete() {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                use tokio::io::{AsyncReadExt, AsyncWriteExt};
                let mut buf = vec![0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                    .await;
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
        let mut group = SubscriptionGroup::new("abc123".to_string(), ProtocolVersion::V2, transport);
        group.close().await.unwrap();
        assert!(!group.is_open());
        drop(group);
    }
}

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream as TungsteniteStream};

use crate::error::{Error, Result};

use super::http::Transport;

/// A WebSocket connection carrying one subscription group's event stream.
///
/// Thin wrapper over `tokio-tungstenite`'s stream: it exists so the rest of
/// the crate speaks in [`Message`] without reaching into the transport's TLS
/// stream type, and so the upgrade handshake can attach the same cookies and
/// digest credentials the HTTP session already negotiated.
pub struct WebSocketStream {
    inner: TungsteniteStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl WebSocketStream {
    /// Upgrade `poll_path` (e.g. `/poll/1`) to a WebSocket connection,
    /// announcing `subprotocol` and replaying the HTTP session's cookies and
    /// digest credentials.
    pub async fn connect(
        transport: &Transport,
        poll_path: &str,
        subprotocol: &str,
    ) -> Result<Self> {
        let mut ws_url = transport
            .base_url()
            .join(poll_path)
            .map_err(|e| Error::invalid_argument(format!("invalid poll path {poll_path:?}: {e}")))?;
        let scheme = match ws_url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        ws_url
            .set_scheme(scheme)
            .map_err(|_| Error::logic("failed to rewrite poll URL scheme"))?;

        let mut request = ws_url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(
            "Sec-WebSocket-Protocol",
            subprotocol.parse().map_err(|_| Error::logic("invalid subprotocol header value"))?,
        );
        if let Some(cookie) = transport.cookie_header() {
            headers.insert(
                reqwest::header::COOKIE.as_str(),
                cookie.parse().map_err(|_| Error::logic("invalid cookie header value"))?,
            );
        }
        if let Some(auth) = transport.auth_header_for("GET", poll_path) {
            headers.insert(
                reqwest::header::AUTHORIZATION.as_str(),
                auth.parse().map_err(|_| Error::logic("invalid authorization header value"))?,
            );
        }

        let (stream, response) = tokio_tungstenite::connect_async(request).await?;

        let negotiated = response
            .headers()
            .get("Sec-WebSocket-Protocol")
            .and_then(|v| v.to_str().ok());
        if negotiated != Some(subprotocol) {
            log::warn!(
                "controller did not confirm subscription subprotocol {subprotocol:?} (got {negotiated:?})"
            );
        }

        Ok(Self { inner: stream })
    }

    /// Send a ping frame.
    pub async fn send_ping(&mut self) -> Result<()> {
        self.inner.send(Message::Ping(Vec::new())).await?;
        Ok(())
    }

    /// Send a pong frame in response to a server ping.
    pub async fn send_pong(&mut self, payload: Vec<u8>) -> Result<()> {
        self.inner.send(Message::Pong(payload)).await?;
        Ok(())
    }

    /// Receive the next frame, or `None` if the connection closed cleanly.
    pub async fn next_message(&mut self) -> Result<Option<Message>> {
        match self.inner.next().await {
            Some(Ok(msg)) => Ok(Some(msg)),
            Some(Err(e)) => Err(Error::from(e)),
            None => Ok(None),
        }
    }

    /// Close the connection with a normal closure frame.
    pub async fn close(&mut self) -> Result<()> {
        self.inner.close(None).await?;
        Ok(())
    }
}

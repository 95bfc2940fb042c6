use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_tungstenite::tungstenite::Message;

use crate::error::{Error, Result};
use crate::events::{dispatch_frame, OnSubscriptionEvent};
use crate::transport::{Transport, WebSocketStream};

use super::group::SubscriptionGroup;

/// How often the receive loop re-checks its deadline and shutdown flag while
/// waiting for a frame. One second works for both protocol versions; under
/// TLS it is effectively doubled by a known quirk in how the async TLS
/// stream reports read timeouts, which is harmless here since the loop just
/// spins once more.
const WEBSOCKET_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Polls one subscription group's WebSocket and dispatches its events.
///
/// Owns the ping/pong heartbeat discipline: the controller pings periodically
/// to keep the connection alive, and this receiver must answer with a pong
/// and reset its deadline, or the connection is declared dead.
pub struct SubscriptionReceiver {
    socket: WebSocketStream,
    last_ping: Instant,
    ping_pong_timeout: Duration,
    shutdown: Arc<AtomicBool>,
}

impl SubscriptionReceiver {
    /// Upgrade `group`'s poll endpoint to a WebSocket connection.
    pub async fn connect(transport: &Transport, group: &SubscriptionGroup, ping_pong_timeout: Duration) -> Result<Self> {
        let socket = WebSocketStream::connect(
            transport,
            &group.poll_path(),
            group.protocol_version().subscription_subprotocol(),
        )
        .await?;

        Ok(Self {
            socket,
            last_ping: Instant::now(),
            ping_pong_timeout,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// A handle that, when set, makes the next [`SubscriptionReceiver::wait_for_event`]
    /// return `Ok(false)` instead of blocking further. Safe to call from
    /// another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown.clone())
    }

    /// Wait for and dispatch the next event frame, retrying through ping
    /// frames until either an event frame arrives, the connection closes, or
    /// the heartbeat deadline elapses.
    pub async fn wait_for_event(&mut self, callbacks: &mut dyn OnSubscriptionEvent) -> Result<ReceiveOutcome> {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return Ok(ReceiveOutcome::Shutdown);
            }
            if self.last_ping.elapsed() >= self.ping_pong_timeout {
                return Err(Error::timeout(format!(
                    "WebSocket failed to receive heartbeat message within {:?}",
                    self.ping_pong_timeout
                )));
            }

            let next = tokio::time::timeout(WEBSOCKET_UPDATE_INTERVAL, self.socket.next_message()).await;
            let message = match next {
                Err(_elapsed) => continue,
                Ok(result) => result?,
            };

            match message {
                None => return Ok(ReceiveOutcome::Closed),
                Some(Message::Close(_)) => return Ok(ReceiveOutcome::Closed),
                Some(Message::Ping(payload)) => {
                    self.last_ping = Instant::now();
                    self.socket.send_pong(payload).await?;
                }
                Some(Message::Pong(_)) => {}
                Some(Message::Text(text)) => {
                    dispatch_frame(&text, callbacks)?;
                    return Ok(ReceiveOutcome::Event);
                }
                Some(Message::Binary(bytes)) => {
                    let text = String::from_utf8(bytes)
                        .map_err(|_| Error::protocol_simple("received non-UTF8 binary WebSocket frame"))?;
                    dispatch_frame(&text, callbacks)?;
                    return Ok(ReceiveOutcome::Event);
                }
                Some(Message::Frame(_)) => {}
            }
        }
    }

    /// Shut the connection down from the owning task.
    pub async fn close(&mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        self.socket.close().await
    }
}

/// Outcome of one [`SubscriptionReceiver::wait_for_event`] call. A missed
/// heartbeat is not represented here: it surfaces as `Err(Error::Timeout(..))`
/// instead, since unlike the other outcomes it is a failure the caller must
/// decide how to recover from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// An event frame was parsed and dispatched to the callback.
    Event,
    /// The peer closed the connection.
    Closed,
    /// `shutdown()` was called from another task.
    Shutdown,
}

/// A cloneable flag used to request that a running [`SubscriptionReceiver`]
/// stop waiting for events, from outside the task that owns it.
#[derive(Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_handle_is_observed() {
        let flag = Arc::new(AtomicBool::new(false));
        let handle = ShutdownHandle(flag.clone());
        assert!(!flag.load(Ordering::SeqCst));
        handle.shutdown();
        assert!(flag.load(Ordering::SeqCst));
    }
}

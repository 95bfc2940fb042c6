//! HTTP/WebSocket transport: session cookie retention, digest authentication,
//! and the raw request/response plumbing the rest of the crate builds on.

mod digest;
mod http;
mod websocket;

pub use http::Transport;
pub use websocket::WebSocketStream;

use std::collections::HashMap;

use bytes::Bytes;

/// A raw HTTP response: the pieces [`crate::result::Response`] needs and
/// nothing more. Headers are lower-cased on the way in so callers never miss
/// a match on casing. The body is kept as the `Bytes` `reqwest` already hands
/// back, rather than copied into a `Vec`.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub method: String,
    pub uri: String,
    pub status: u16,
    pub reason: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }
}

//! Error taxonomy for the RWS client.

use thiserror::Error;

/// The kinds of failure the client surfaces to its caller.
///
/// Every variant matches a kind from the library's error taxonomy rather than
/// a single underlying type: several of them (notably [`Error::Protocol`]) carry
/// enough context for a caller to log a useful diagnostic without re-deriving it
/// from the request that failed.
#[derive(Error, Debug)]
pub enum Error {
    /// A client-side precondition was violated before any request was sent
    /// (an out-of-range argument, an unrecognized enum wire string).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The controller responded in a way this client cannot interpret: an
    /// unexpected status code, a missing header, a missing or malformed XML node,
    /// or an unrecognized subscription event class.
    #[error("protocol error: {0}")]
    Protocol(Box<ProtocolErrorDetail>),

    /// A blocking operation's deadline elapsed, or the subscription heartbeat
    /// was missed.
    #[error("timeout: {0}")]
    Timeout(String),

    /// A transport-level failure: connection refused, TLS handshake failure,
    /// or an unexpected socket close.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal invariant was violated (a library returned something this
    /// code assumed could not happen).
    #[error("internal error: {0}")]
    Logic(String),
}

/// Context carried by [`Error::Protocol`].
#[derive(Debug, Default, Clone)]
pub struct ProtocolErrorDetail {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// HTTP method of the request that failed, e.g. `"GET"`.
    pub method: String,
    /// URI (path, not including scheme/host) of the request that failed.
    pub uri: String,
    /// HTTP status code returned by the controller, or 0 if there was none
    /// (e.g. a malformed response body).
    pub status: u16,
    /// HTTP reason phrase, if any.
    pub reason: Option<String>,
    /// Request body, if the request carried one.
    pub request_body: Option<String>,
    /// Response body, verbatim.
    pub response_body: Option<String>,
}

impl std::fmt::Display for ProtocolErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.method.is_empty() || !self.uri.is_empty() {
            write!(f, " ({} {}", self.method, self.uri)?;
            if self.status != 0 {
                write!(f, " -> {}", self.status)?;
                if let Some(reason) = &self.reason {
                    if !reason.is_empty() {
                        write!(f, " {reason}")?;
                    }
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl Error {
    /// Build an [`Error::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Build an [`Error::Timeout`].
    pub fn timeout(message: impl Into<String>) -> Self {
        Error::Timeout(message.into())
    }

    /// Build an [`Error::Logic`].
    pub fn logic(message: impl Into<String>) -> Self {
        Error::Logic(message.into())
    }

    /// Build an [`Error::Protocol`] carrying full request/response context.
    #[allow(clippy::too_many_arguments)]
    pub fn protocol(
        message: impl Into<String>,
        method: impl Into<String>,
        uri: impl Into<String>,
        status: u16,
        reason: Option<String>,
        request_body: Option<String>,
        response_body: Option<String>,
    ) -> Self {
        Error::Protocol(Box::new(ProtocolErrorDetail {
            message: message.into(),
            method: method.into(),
            uri: uri.into(),
            status,
            reason,
            request_body,
            response_body,
        }))
    }

    /// Build a minimal [`Error::Protocol`] when there is no HTTP exchange to
    /// reference, e.g. a malformed subscription event.
    pub fn protocol_simple(message: impl Into<String>) -> Self {
        Error::Protocol(Box::new(ProtocolErrorDetail {
            message: message.into(),
            ..Default::default()
        }))
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::protocol_simple(format!("failed to parse XML response body: {e}"))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Io(std::io::Error::other(e.to_string()))
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match e {
            WsError::Io(io) => Error::Io(io),
            other => Error::Io(std::io::Error::other(other.to_string())),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_message_includes_context() {
        let e = Error::protocol(
            "unexpected status",
            "POST",
            "/rw/panel/ctrlstate",
            500,
            Some("Internal Server Error".to_string()),
            None,
            None,
        );
        let msg = e.to_string();
        assert!(msg.contains("POST"));
        assert!(msg.contains("/rw/panel/ctrlstate"));
        assert!(msg.contains("500"));
    }
}

//! Decodes a raw transport response into either a parsed XML document or a
//! [`crate::error::Error::Protocol`] carrying full request/response context.

use roxmltree::Document;

use crate::error::{Error, Result};
use crate::transport::RawResponse;

/// A successful response, with its body parsed into an XML tree on demand.
///
/// The body is kept as owned bytes; [`Response::document`] parses it lazily
/// so callers that only need the status code (e.g. a bare `PUT`) never pay
/// for a parse they don't use.
pub struct Response {
    raw: RawResponse,
}

impl Response {
    pub(crate) fn new(raw: RawResponse) -> Self {
        Self { raw }
    }

    pub fn status(&self) -> u16 {
        self.raw.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw.header(name)
    }

    pub fn body_bytes(&self) -> &[u8] {
        self.raw.body.as_ref()
    }

    pub fn body_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.raw.body)
            .map_err(|e| Error::protocol_simple(format!("response body is not valid UTF-8: {e}")))
    }

    /// Parse the body as XML. Returns a borrowed [`roxmltree::Document`]
    /// whose node views live as long as the returned value; callers
    /// extracting more than one field should hold onto the document rather
    /// than re-parsing.
    pub fn document(&self) -> Result<Document<'_>> {
        let text = self.body_str()?;
        Document::parse(text).map_err(Error::from)
    }
}

/// Turn a transport-level response into a decoded [`Response`], or an
/// [`Error::Protocol`] if the controller reported failure.
///
/// `status < 300` is success. `3xx` is treated as failure here: redirect
/// following, when wanted, happens one layer up in the client so it can
/// enforce "same host only".
pub(crate) fn decode(raw: RawResponse) -> Result<Response> {
    if raw.status < 300 {
        return Ok(Response::new(raw));
    }

    let reason = raw.reason.clone();
    let request_body = None;
    let response_body = Some(String::from_utf8_lossy(&raw.body).to_string());
    Err(Error::protocol(
        "unexpected HTTP status",
        raw.method.clone(),
        raw.uri.clone(),
        raw.status,
        reason,
        request_body,
        response_body,
    ))
}

/// `true` if `status` is a redirect this client is willing to follow (to the
/// same host only; the caller is responsible for checking the host).
pub(crate) fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

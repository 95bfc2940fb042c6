use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::redirect::Policy;
use reqwest::{Method, StatusCode, Url};

use crate::error::{Error, Result};

use super::digest::{self, DigestChallenge, NonceCounter};
use super::RawResponse;

/// Owns the HTTP session to a single controller: the underlying
/// [`reqwest::Client`], the digest-auth challenge/nonce state, and a manual
/// cookie jar replayed on every request (including the WebSocket upgrade,
/// which `reqwest`'s own cookie store cannot reach).
pub struct Transport {
    client: Mutex<reqwest::Client>,
    base_url: Url,
    username: String,
    password: String,
    cookies: Mutex<HashMap<String, String>>,
    digest: Mutex<Option<DigestChallenge>>,
    nonce_counter: NonceCounter,
    timeout: Mutex<Duration>,
    verify_server_certs: bool,
}

impl Transport {
    /// Build a transport pointed at `base_url`. `reqwest`'s own redirect
    /// policy is disabled here: it can only follow-or-not, not "follow to
    /// the same host only", so the client module chases redirects itself
    /// one layer up and hands every response to this transport's caller
    /// unmodified.
    pub fn new(
        base_url: Url,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
        verify_server_certs: bool,
    ) -> Result<Self> {
        let client = Self::build_client(timeout, verify_server_certs)?;
        Ok(Self {
            client: Mutex::new(client),
            base_url,
            username: username.into(),
            password: password.into(),
            cookies: Mutex::new(HashMap::new()),
            digest: Mutex::new(None),
            nonce_counter: NonceCounter::new(),
            timeout: Mutex::new(timeout),
            verify_server_certs,
        })
    }

    fn build_client(timeout: Duration, verify_server_certs: bool) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .redirect(Policy::none())
            .danger_accept_invalid_certs(!verify_server_certs)
            .timeout(timeout)
            .build()
            .map_err(Error::from)
    }

    /// Replace the request timeout. Mirrors the controller's own behavior of
    /// treating a changed timeout as a reason to open a fresh socket: the
    /// underlying `reqwest::Client` is rebuilt, the session cookies and
    /// digest state are left untouched.
    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        let client = Self::build_client(timeout, self.verify_server_certs)?;
        *self.client.lock() = client;
        *self.timeout.lock() = timeout;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        *self.timeout.lock()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The `Cookie:` header value this transport would attach right now, for
    /// reuse on the WebSocket upgrade handshake.
    pub fn cookie_header(&self) -> Option<String> {
        let jar = self.cookies.lock();
        if jar.is_empty() {
            return None;
        }
        Some(
            jar.iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// The `Authorization:` header value this transport would attach to a
    /// request for `method path` right now, if a digest challenge has
    /// already been negotiated over this session. Used by the WebSocket
    /// upgrade, which shares the session's credentials but is issued through
    /// a different client.
    pub fn auth_header_for(&self, method: &str, path: &str) -> Option<String> {
        let challenge = self.digest.lock().clone()?;
        let cnonce = format!("{:08x}", rand::random::<u32>());
        Some(digest::authorization_header(
            &self.username,
            &self.password,
            method,
            path,
            &challenge,
            &cnonce,
            &self.nonce_counter,
        ))
    }

    fn record_cookies(&self, response: &reqwest::Response) {
        let mut jar = self.cookies.lock();
        for value in response.headers().get_all(reqwest::header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let Some(pair) = value.split(';').next() else { continue };
            if let Some((name, val)) = pair.split_once('=') {
                jar.insert(name.trim().to_string(), val.trim().to_string());
            }
        }
    }

    pub async fn get(&self, path: &str) -> Result<RawResponse> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Option<(Vec<u8>, &str)>) -> Result<RawResponse> {
        self.request(Method::POST, path, body).await
    }

    pub async fn put(&self, path: &str, body: Option<(Vec<u8>, &str)>) -> Result<RawResponse> {
        self.request(Method::PUT, path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<RawResponse> {
        self.request(Method::DELETE, path, None).await
    }

    /// Issue one request, retrying exactly once if the controller returns a
    /// fresh digest challenge (the first request of a session is always
    /// unauthenticated and draws one).
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<(Vec<u8>, &str)>,
    ) -> Result<RawResponse> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| Error::invalid_argument(format!("invalid request path {path:?}: {e}")))?;

        let response = self.send_once(&method, &url, path, &body).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(challenge) = response
                .headers()
                .get(reqwest::header::WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .and_then(DigestChallenge::parse)
            {
                *self.digest.lock() = Some(challenge);
                self.record_cookies(&response);
                let response = self.send_once(&method, &url, path, &body).await?;
                return self.into_raw(method, path, response, &body).await;
            }
        }
        self.into_raw(method, path, response, &body).await
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        path: &str,
        body: &Option<(Vec<u8>, &str)>,
    ) -> Result<reqwest::Response> {
        let client = self.client.lock().clone();
        let mut builder = client.request(method.clone(), url.clone());

        if let Some(cookie) = self.cookie_header() {
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }
        if let Some(challenge) = self.digest.lock().clone() {
            let cnonce = format!("{:08x}", rand::random::<u32>());
            let auth = digest::authorization_header(
                &self.username,
                &self.password,
                method.as_str(),
                path,
                &challenge,
                &cnonce,
                &self.nonce_counter,
            );
            builder = builder.header(reqwest::header::AUTHORIZATION, auth);
        }
        if let Some((bytes, content_type)) = body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, *content_type)
                .body(bytes.clone());
        }

        let response = builder.send().await?;
        self.record_cookies(&response);
        Ok(response)
    }

    async fn into_raw(
        &self,
        method: Method,
        path: &str,
        response: reqwest::Response,
        _request_body: &Option<(Vec<u8>, &str)>,
    ) -> Result<RawResponse> {
        let status = response.status().as_u16();
        let reason = response.status().canonical_reason().map(|s| s.to_string());
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }
        let body = response.bytes().await.map_err(Error::from)?;

        Ok(RawResponse {
            method: method.as_str().to_string(),
            uri: path.to_string(),
            status,
            reason,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_joins_all_cookies() {
        let t = Transport::new(
            Url::parse("http://localhost/").unwrap(),
            "user",
            "pass",
            Duration::from_secs(5),
            false,
        )
        .unwrap();
        assert_eq!(t.cookie_header(), None);
        t.cookies.lock().insert("ABBCX".to_string(), "1".to_string());
        assert_eq!(t.cookie_header().as_deref(), Some("ABBCX=1"));
    }
}

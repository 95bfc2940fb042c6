//! RFC 2617 HTTP Digest authentication.
//!
//! RWS controllers authenticate with Digest rather than Basic auth. No crate
//! in reach of this workspace implements it, so it is hand-rolled here on top
//! of the `md5` crate the same way the rest of the transport leans on small,
//! single-purpose crates rather than a kitchen-sink HTTP auth library.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Option<String>,
    pub opaque: Option<String>,
    pub algorithm: String,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value. Returns `None` if it is not a
    /// `Digest` challenge, or is missing `realm`/`nonce`.
    pub fn parse(header_value: &str) -> Option<Self> {
        let rest = header_value.trim();
        let rest = rest.strip_prefix("Digest ")?;
        let params = parse_auth_params(rest);

        Some(Self {
            realm: params.get("realm")?.clone(),
            nonce: params.get("nonce")?.clone(),
            qop: params.get("qop").cloned(),
            opaque: params.get("opaque").cloned(),
            algorithm: params
                .get("algorithm")
                .cloned()
                .unwrap_or_else(|| "MD5".to_string()),
        })
    }
}

/// Splits a comma-separated `key=value` or `key="value"` parameter list.
fn parse_auth_params(s: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for part in split_params(s) {
        if let Some((k, v)) = part.split_once('=') {
            let k = k.trim();
            let v = v.trim().trim_matches('"');
            out.insert(k.to_string(), v.to_string());
        }
    }
    out
}

/// Splits on commas that are not inside a quoted string.
fn split_params(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                out.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(s[start..].trim());
    out
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Per-connection nonce counter, incremented for every digest response built
/// against the same challenge.
#[derive(Debug, Default)]
pub struct NonceCounter(AtomicU32);

impl NonceCounter {
    pub fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Build the `Authorization: Digest ...` header value for `method uri` under
/// `challenge`, using HTTP digest auth with qop=auth when offered.
pub fn authorization_header(
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    challenge: &DigestChallenge,
    cnonce: &str,
    counter: &NonceCounter,
) -> String {
    let ha1 = md5_hex(&format!("{username}:{}:{password}", challenge.realm));
    let ha2 = md5_hex(&format!("{method}:{uri}"));

    let (response, nc_and_qop) = match &challenge.qop {
        Some(qop) => {
            let nc = counter.next();
            let nc_str = format!("{nc:08x}");
            let qop_value = if qop.split(',').any(|q| q.trim() == "auth") {
                "auth"
            } else {
                qop.trim()
            };
            let response = md5_hex(&format!(
                "{ha1}:{}:{nc_str}:{cnonce}:{qop_value}:{ha2}",
                challenge.nonce
            ));
            (response, Some((nc_str, qop_value.to_string())))
        }
        None => {
            let response = md5_hex(&format!("{ha1}:{}:{ha2}", challenge.nonce));
            (response, None)
        }
    };

    let mut header = format!(
        "Digest username=\"{username}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", response=\"{response}\"",
        challenge.realm, challenge.nonce
    );
    if let Some(opaque) = &challenge.opaque {
        header.push_str(&format!(", opaque=\"{opaque}\""));
    }
    if let Some((nc_str, qop_str)) = nc_and_qop {
        header.push_str(&format!(", qop={qop_str}, nc={nc_str}, cnonce=\"{cnonce}\""));
    }
    header.push_str(&format!(", algorithm={}", challenge.algorithm));
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc2069_style_challenge() {
        let header = r#"Digest realm="RobotWare", nonce="abc123", opaque="xyz""#;
        let c = DigestChallenge::parse(header).unwrap();
        assert_eq!(c.realm, "RobotWare");
        assert_eq!(c.nonce, "abc123");
        assert_eq!(c.opaque.as_deref(), Some("xyz"));
        assert!(c.qop.is_none());
    }

    #[test]
    fn parses_qop_auth_challenge() {
        let header = r#"Digest realm="RobotWare", qop="auth", nonce="n1", opaque="o1""#;
        let c = DigestChallenge::parse(header).unwrap();
        assert_eq!(c.qop.as_deref(), Some("auth"));
    }

    #[test]
    fn non_digest_scheme_returns_none() {
        assert!(DigestChallenge::parse("Basic realm=\"x\"").is_none());
    }

    #[test]
    fn response_is_stable_rfc2069_vector() {
        // RFC 2617 section 3.5 worked example.
        let challenge = DigestChallenge {
            realm: "testrealm@host.com".to_string(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
            qop: Some("auth".to_string()),
            opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".to_string()),
            algorithm: "MD5".to_string(),
        };
        let counter = NonceCounter::new();
        let header = authorization_header(
            "Mufasa",
            "Circle Of Life",
            "GET",
            "/dir/index.html",
            &challenge,
            "0a4f113b",
            &counter,
        );
        assert!(header.contains("username=\"Mufasa\""));
        assert!(header.contains("nc=00000001"));
    }
}

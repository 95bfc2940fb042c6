//! `/users`: registering this session as a local or remote UAS user.

use crate::error::Result;

use super::Client;

/// Username RWS assumes when none is supplied, matching the controller's own
/// default local account.
pub const DEFAULT_USERNAME: &str = "Default User";
/// Application name used when a remote client doesn't supply its own.
pub const EXTERNAL_APPLICATION: &str = "ExternalApplication";
/// Location used when a remote client doesn't supply its own.
pub const EXTERNAL_LOCATION: &str = "ExternalLocation";

impl Client {
    /// `POST /users?action=register` for a user connecting from the local
    /// network.
    pub async fn register_local_user(&self, username: &str, application: &str, location: &str) -> Result<()> {
        self.register_user(username, application, location).await
    }

    /// `POST /users?action=register` for a user connecting from outside the
    /// controller's own network, using the RWS defaults when not specified.
    pub async fn register_remote_user(
        &self,
        username: Option<&str>,
        application: Option<&str>,
        location: Option<&str>,
    ) -> Result<()> {
        self.register_user(
            username.unwrap_or(DEFAULT_USERNAME),
            application.unwrap_or(EXTERNAL_APPLICATION),
            location.unwrap_or(EXTERNAL_LOCATION),
        )
        .await
    }

    async fn register_user(&self, username: &str, application: &str, location: &str) -> Result<()> {
        let body = format!(
            "username={}&application={}&location={}",
            urlencode(username),
            urlencode(application),
            urlencode(location)
        );
        self.decode_post(
            "/users?action=register",
            Some((body.into_bytes(), "application/x-www-form-urlencoded")),
        )
        .await?;
        Ok(())
    }
}

/// Minimal `application/x-www-form-urlencoded` value encoder: RWS usernames
/// and locations are short identifiers, so only the handful of characters
/// that would otherwise break field delimiting need escaping.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencode_escapes_reserved_characters() {
        assert_eq!(urlencode("Default User"), "Default+User");
        assert_eq!(urlencode("a&b=c"), "a%26b%3Dc");
        assert_eq!(urlencode(EXTERNAL_APPLICATION), "ExternalApplication");
    }
}

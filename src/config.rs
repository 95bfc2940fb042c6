//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::retry::RetryPolicyConfig;

/// Credentials used to authenticate against the controller's digest auth
/// realm.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ClientUserToken {
    /// Username, e.g. `"Default User"`.
    pub user: String,
    /// Password.
    pub password: String,
}

impl ClientUserToken {
    /// Construct a user/password token.
    pub fn user_pass(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Check that the token is usable. Does not contact the controller.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.user.is_empty() {
            errors.push("user token has an empty name".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration for a [`crate::client::Client`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the controller, e.g. `https://127.0.0.1:443`.
    #[serde(with = "url_serde")]
    pub base_url: Url,
    /// Credentials for digest authentication.
    pub user_token: ClientUserToken,
    /// Per-request HTTP timeout.
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    /// Ping/pong heartbeat timeout for subscription WebSockets. The
    /// controller is expected to ping at least this often; if it doesn't,
    /// the receive loop raises [`crate::error::Error::Timeout`].
    #[serde(with = "duration_secs")]
    pub subscription_ping_pong_timeout: Duration,
    /// Whether the controller's TLS certificate must verify. Controllers are
    /// routinely reached by IP with a self-signed certificate, so this
    /// defaults to `false`; set it `true` to require a verifiable chain.
    #[serde(default = "default_verify_server_certs")]
    pub verify_server_certs: bool,
    /// Retry policy used while establishing the initial connection in
    /// [`crate::client::Client::connect`].
    #[serde(default)]
    pub retry_policy: RetryPolicyConfig,
}

fn default_verify_server_certs() -> bool {
    false
}

impl ClientConfig {
    /// Start building a configuration for `base_url`.
    pub fn builder(base_url: Url) -> ClientConfigBuilder {
        ClientConfigBuilder::new(base_url)
    }

    pub fn validate(&self) -> Result<()> {
        self.user_token
            .validate()
            .map_err(|errors| Error::invalid_argument(errors.join("; ")))?;
        if self.base_url.scheme() != "http" && self.base_url.scheme() != "https" {
            return Err(Error::invalid_argument(format!(
                "base_url must use http or https, got {:?}",
                self.base_url.scheme()
            )));
        }
        Ok(())
    }
}

/// Builder for [`ClientConfig`], mirroring the defaults the controller
/// itself assumes when a client omits them.
pub struct ClientConfigBuilder {
    base_url: Url,
    user_token: ClientUserToken,
    request_timeout: Duration,
    subscription_ping_pong_timeout: Duration,
    verify_server_certs: bool,
    retry_policy: RetryPolicyConfig,
}

impl ClientConfigBuilder {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            user_token: ClientUserToken::user_pass("Default User", "robotics"),
            request_timeout: Duration::from_secs(40),
            subscription_ping_pong_timeout: Duration::from_secs(120),
            verify_server_certs: default_verify_server_certs(),
            retry_policy: RetryPolicyConfig::default(),
        }
    }

    pub fn user_token(mut self, token: ClientUserToken) -> Self {
        self.user_token = token;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn subscription_ping_pong_timeout(mut self, timeout: Duration) -> Self {
        self.subscription_ping_pong_timeout = timeout;
        self
    }

    /// Whether the controller's TLS certificate must verify.
    pub fn verify_server_certs(mut self, verify: bool) -> Self {
        self.verify_server_certs = verify;
        self
    }

    /// Retry policy used while establishing the initial connection.
    pub fn retry_policy(mut self, policy: RetryPolicyConfig) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let config = ClientConfig {
            base_url: self.base_url,
            user_token: self.user_token,
            request_timeout: self.request_timeout,
            subscription_ping_pong_timeout: self.subscription_ping_pong_timeout,
            verify_server_certs: self.verify_server_certs,
            retry_policy: self.retry_policy,
        };
        config.validate()?;
        Ok(config)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

mod url_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use url::Url;

    pub fn serialize<S: Serializer>(u: &Url, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(u.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Url, D::Error> {
        let s = String::deserialize(d)?;
        Url::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_defaults() {
        let config = ClientConfig::builder(Url::parse("https://127.0.0.1").unwrap())
            .build()
            .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(40));
        assert_eq!(config.subscription_ping_pong_timeout, Duration::from_secs(120));
    }

    #[test]
    fn empty_username_rejected() {
        let result = ClientConfig::builder(Url::parse("https://127.0.0.1").unwrap())
            .user_token(ClientUserToken::user_pass("", "x"))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn non_http_scheme_rejected() {
        let result = ClientConfig::builder(Url::parse("ftp://127.0.0.1").unwrap()).build();
        assert!(result.is_err());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = ClientConfig::builder(Url::parse("https://127.0.0.1").unwrap())
            .verify_server_certs(true)
            .retry_policy(RetryPolicyConfig::None)
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let decoded: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.base_url, config.base_url);
        assert_eq!(decoded.request_timeout, config.request_timeout);
        assert_eq!(decoded.verify_server_certs, config.verify_server_certs);
        assert_eq!(decoded.retry_policy, config.retry_policy);
    }

    #[test]
    fn retry_policy_and_cert_verification_default() {
        let config = ClientConfig::builder(Url::parse("https://127.0.0.1").unwrap())
            .build()
            .unwrap();
        assert!(!config.verify_server_certs);
        assert_eq!(config.retry_policy, RetryPolicyConfig::default());
    }
}

use std::fmt;

use serde::Deserialize;
use url::Url;

use crate::error::ChannelError;

/// Connection settings for the Redis channel, as supplied by the host.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedisCredential {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default, alias = "disable_tls_verification", alias = "disabletlsverification")]
    pub disable_tls_verification: bool,
    #[serde(default)]
    pub database: i64,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl RedisCredential {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ssl: false,
            disable_tls_verification: false,
            database: 0,
            user: None,
            password: None,
        }
    }

    /// Connection URL understood by the `redis` crate.
    ///
    /// `rediss://` when TLS is on, `#insecure` when verification is off,
    /// database index as the path. Auth parts are percent-encoded.
    pub fn connection_url(&self) -> Result<Url, ChannelError> {
        let scheme = if self.ssl { "rediss" } else { "redis" };
        let mut url = Url::parse(&format!("{}://{}:{}/{}", scheme, self.host, self.port, self.database))
            .map_err(|e| ChannelError::Credential(format!("invalid redis address: {}", e)))?;

        if let Some(user) = self.user.as_deref().filter(|u| !u.is_empty()) {
            url.set_username(user)
                .map_err(|_| ChannelError::Credential("redis user cannot be set on this address".into()))?;
        }
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|_| ChannelError::Credential("redis password cannot be set on this address".into()))?;
        }
        if self.ssl && self.disable_tls_verification {
            url.set_fragment(Some("insecure"));
        }
        Ok(url)
    }
}

// Secrets never reach the logs.
impl fmt::Debug for RedisCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCredential")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ssl", &self.ssl)
            .field("disable_tls_verification", &self.disable_tls_verification)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

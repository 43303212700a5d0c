//! Configuration for the session manager.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default backend name.
pub const DEFAULT_PROVIDER: &str = "memory";

/// Default cookie carrying the session identifier.
pub const DEFAULT_COOKIE_NAME: &str = "SESSION_ID";

/// Default maximum idle lifetime (one hour).
pub const DEFAULT_LIFETIME_SECS: u64 = 3600;

/// Longest accepted idle lifetime (ten years).
const MAX_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// What to do when a request presents a cookie for a session that is not live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownSidPolicy {
    /// Create a fresh, empty session under the presented identifier.
    #[default]
    Adopt,
    /// Discard the presented identifier and issue a new one.
    Reissue,
}

/// Configuration for the session manager.
///
/// Immutable once handed to [`SessionManager`](crate::SessionManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the registered backend to resolve.
    pub provider: String,

    /// Cookie name used to carry the session identifier.
    #[serde(rename = "cookie")]
    pub cookie_name: String,

    /// Maximum idle lifetime in seconds. Also the sweep cadence and the
    /// cookie `Max-Age`.
    #[serde(rename = "timeout")]
    pub lifetime_secs: u64,

    /// Handling of cookies that name an unknown session.
    pub unknown_sid: UnknownSidPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            lifetime_secs: DEFAULT_LIFETIME_SECS,
            unknown_sid: UnknownSidPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `[session]` table body from TOML. Missing keys take defaults.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the backend name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set the cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the idle lifetime in seconds.
    pub fn with_lifetime_secs(mut self, secs: u64) -> Self {
        self.lifetime_secs = secs;
        self
    }

    /// Set the unknown-SID policy.
    pub fn with_unknown_sid(mut self, policy: UnknownSidPolicy) -> Self {
        self.unknown_sid = policy;
        self
    }

    /// Idle lifetime as a [`Duration`].
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    /// Check that the values can drive a manager.
    pub fn validate(&self) -> Result<()> {
        if self.lifetime_secs == 0 {
            return Err(Error::InvalidConfig(
                "session timeout must be at least one second".to_string(),
            ));
        }
        if self.lifetime_secs > MAX_LIFETIME_SECS {
            return Err(Error::InvalidConfig(format!(
                "session timeout {} is out of range",
                self.lifetime_secs
            )));
        }
        if self.cookie_name.is_empty()
            || !self
                .cookie_name
                .bytes()
                .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b))
        {
            return Err(Error::InvalidConfig(format!(
                "invalid cookie name {:?}",
                self.cookie_name
            )));
        }
        Ok(())
    }
}

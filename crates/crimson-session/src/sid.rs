//! Session identifiers and the entropy they are drawn from.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// Number of random bytes behind every generated identifier (256 bits).
pub const SID_BYTES: usize = 32;

/// Source of random bytes for new session identifiers.
pub trait EntropySource: Send + Sync {
    /// Fill `dest` completely or fail with [`Error::RandomSource`].
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// Operating-system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| Error::RandomSource(e.to_string()))
    }
}

/// Opaque session identity carried in the session cookie.
///
/// Generated identifiers are 32 random bytes encoded as unpadded
/// URL-safe base64. Identifiers read back from cookies are taken as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Draw a fresh identifier from `source`.
    pub fn generate(source: &dyn EntropySource) -> Result<Self> {
        let mut bytes = [0u8; SID_BYTES];
        source.fill(&mut bytes)?;
        Ok(Self(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Borrow the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the textual form.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

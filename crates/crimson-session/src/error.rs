//! Error types for session management.

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The entropy source could not produce a session identifier.
    #[error("Random source failure: {0}")]
    RandomSource(String),

    /// A provider with this name is already registered.
    #[error("Session provider already registered: {0}")]
    DuplicateProvider(String),

    /// Provider names must be non-empty.
    #[error("Invalid session provider name: {0:?}")]
    InvalidProviderName(String),

    /// No provider is registered under this name.
    #[error("Unknown session provider: {0}")]
    UnknownProvider(String),

    /// A response cookie could not be encoded as a header value.
    #[error("Invalid session cookie: {0}")]
    Cookie(String),

    /// A configuration value is out of range.
    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse session config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;

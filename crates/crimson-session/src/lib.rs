//! In-memory sessions correlated with clients through a cookie.
//!
//! This crate provides:
//! - Unguessable 256-bit session identifiers
//! - A recency-ordered in-memory store with O(1) touch and cheap expiry sweeps
//! - A registry of named backends resolved once at startup
//! - A manager that maps request cookies to sessions and writes response cookies
//! - A background sweeper that evicts idle sessions periodically
//!
//! # Example
//!
//! ```rust,ignore
//! use crimson_session::{ProviderRegistry, SessionConfig, SessionManager};
//!
//! let registry = ProviderRegistry::with_builtin();
//! let manager = SessionManager::from_registry(SessionConfig::default(), &registry)?;
//! let _sweeper = manager.start_eviction();
//!
//! let session = manager.start_session(request.headers(), response.headers_mut())?;
//! session.set("user", "ada");
//! ```

pub mod cookies;
mod config;
mod error;
mod eviction;
mod manager;
mod registry;
mod session;
mod sid;
mod store;

pub use config::{
    DEFAULT_COOKIE_NAME, DEFAULT_LIFETIME_SECS, DEFAULT_PROVIDER, SessionConfig,
    UnknownSidPolicy,
};
pub use error::{Error, Result};
pub use eviction::EvictionHandle;
pub use manager::SessionManager;
pub use registry::{BackendKind, ProviderRegistry};
pub use session::Session;
pub use sid::{EntropySource, OsEntropy, SID_BYTES, SessionId};
pub use store::{MemoryStore, SessionStore, SharedStore};

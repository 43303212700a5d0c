//! Storage backends for session state.
//!
//! A backend owns every live session: the identity map, each session's
//! key/value bag, and the recency order used for eviction. [`Session`]
//! handles reach the data only through this trait, so every access can
//! bump recency inside the backend's own critical section.
//!
//! [`Session`]: crate::Session

mod memory;

pub use memory::MemoryStore;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::sid::SessionId;

/// Shared handle to a backend.
pub type SharedStore = Arc<dyn SessionStore>;

/// Session storage contract.
///
/// Implementations must be safe to call from many request tasks at once.
pub trait SessionStore: Send + Sync {
    /// Create an empty session under `sid` at the head of the recency order.
    ///
    /// If `sid` is already live its bag is cleared and it moves to the head,
    /// so at most one session exists per identifier.
    fn init(&self, sid: &SessionId);

    /// Look up `sid`, creating it as [`init`](Self::init) would when absent.
    ///
    /// An existing session is left where it is in the recency order.
    /// Returns `true` when the session already existed.
    fn read(&self, sid: &SessionId) -> bool;

    /// Whether `sid` is live. Does not affect recency.
    fn contains(&self, sid: &SessionId) -> bool;

    /// Mark `sid` as accessed now and move it to the head.
    fn touch(&self, sid: &SessionId);

    /// Remove `sid`. Returns `true` if it was live.
    fn destroy(&self, sid: &SessionId) -> bool;

    /// Evict sessions idle for longer than `max_idle`, oldest first.
    /// Returns the number removed.
    fn sweep(&self, max_idle: Duration) -> usize;

    /// Read a value, touching the session.
    fn get(&self, sid: &SessionId, key: &str) -> Option<Value>;

    /// Store a value, touching the session. Returns `false` if `sid` is not live.
    fn set(&self, sid: &SessionId, key: String, value: Value) -> bool;

    /// Remove a value, touching the session.
    fn delete(&self, sid: &SessionId, key: &str) -> Option<Value>;

    /// Replace the value under `key` with `f(current)` in one critical
    /// section, touching the session. Returns the new value, or `None` if
    /// `sid` is not live.
    ///
    /// `f` runs with the backend locked and must not call back into it.
    fn update(
        &self,
        sid: &SessionId,
        key: &str,
        f: &mut dyn FnMut(Option<Value>) -> Value,
    ) -> Option<Value>;

    /// Keys currently held by `sid`, touching the session.
    fn keys(&self, sid: &SessionId) -> Vec<String>;

    /// Number of live sessions.
    fn len(&self) -> usize;

    /// Whether there are no live sessions.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Session handles returned to request handlers.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::sid::SessionId;
use crate::store::SharedStore;

/// Handle to one live session.
///
/// The key/value bag lives in the backend; every accessor goes through it
/// and bumps the session's recency, reads included. Cloning the handle is
/// cheap and all clones see the same state.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    store: SharedStore,
}

impl Session {
    /// Create a fresh, empty session under `id`.
    pub fn create(store: &SharedStore, id: SessionId) -> Self {
        store.init(&id);
        Self {
            id,
            store: Arc::clone(store),
        }
    }

    /// Open the session under `id`, creating it when it is not live.
    pub fn open(store: &SharedStore, id: SessionId) -> Self {
        store.read(&id);
        Self {
            id,
            store: Arc::clone(store),
        }
    }

    /// Handle to `id` only if it is live right now. Never creates a session.
    pub fn open_existing(store: &SharedStore, id: SessionId) -> Option<Self> {
        store.contains(&id).then(|| Self {
            id,
            store: Arc::clone(store),
        })
    }

    /// The session identifier.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Whether the session is still live in its backend.
    pub fn is_live(&self) -> bool {
        self.store.contains(&self.id)
    }

    /// Store `value` under `key`.
    ///
    /// Writes to a session that has since been destroyed or evicted are
    /// dropped.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.store.set(&self.id, key.into(), value.into());
    }

    /// Value under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(&self.id, key)
    }

    /// Value under `key` deserialized into `T`.
    ///
    /// Returns `None` when the key is absent or holds a different shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(session_id = %self.id, key, error = %e, "Session value has unexpected type");
                None
            }
        }
    }

    /// Atomically replace the value under `key` with `f(current)` and
    /// return the new value.
    ///
    /// Concurrent updates of the same key never lose a write. `f` runs while
    /// the backend is locked, so it must not use this or any other session.
    /// Returns `None` once the session has been destroyed or evicted.
    pub fn update<F>(&self, key: &str, f: F) -> Option<Value>
    where
        F: FnOnce(Option<Value>) -> Value,
    {
        let mut f = Some(f);
        self.store.update(&self.id, key, &mut |current| match f.take() {
            Some(f) => f(current),
            None => current.unwrap_or(Value::Null),
        })
    }

    /// Remove `key`, returning its previous value.
    pub fn delete(&self, key: &str) -> Option<Value> {
        self.store.delete(&self.id, key)
    }

    /// Keys currently set.
    pub fn keys(&self) -> Vec<String> {
        self.store.keys(&self.id)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn store() -> SharedStore {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_set_get_delete() {
        let store = store();
        let session = Session::create(&store, SessionId::from("s1"));

        let pairs = [
            ("name", json!("ada")),
            ("count", json!(3)),
            ("flags", json!([true, false])),
            ("nested", json!({"a": {"b": null}})),
            ("", json!("empty key")),
        ];
        for (k, v) in &pairs {
            session.set(*k, v.clone());
        }
        for (k, v) in &pairs {
            assert_eq!(session.get(k).as_ref(), Some(v));
        }
        for (k, v) in &pairs {
            assert_eq!(session.delete(k).as_ref(), Some(v));
            assert_eq!(session.get(k), None);
        }
        assert!(session.keys().is_empty());
    }

    #[test]
    fn test_overwrite() {
        let store = store();
        let session = Session::create(&store, SessionId::from("s1"));

        session.set("k", 1);
        session.set("k", "two");

        assert_eq!(session.get("k"), Some(json!("two")));
        assert_eq!(session.keys(), vec!["k".to_string()]);
    }

    #[test]
    fn test_get_as() {
        let store = store();
        let session = Session::create(&store, SessionId::from("s1"));
        session.set("visits", 7);

        assert_eq!(session.get_as::<u32>("visits"), Some(7));
        assert_eq!(session.get_as::<String>("visits"), None);
        assert_eq!(session.get_as::<u32>("missing"), None);
    }

    #[test]
    fn test_update() {
        let store = store();
        let session = Session::create(&store, SessionId::from("s1"));

        let first = session.update("visits", |v| json!(v.and_then(|v| v.as_u64()).unwrap_or(0) + 1));
        let second = session.update("visits", |v| json!(v.and_then(|v| v.as_u64()).unwrap_or(0) + 1));

        assert_eq!(first, Some(json!(1)));
        assert_eq!(second, Some(json!(2)));
        assert_eq!(session.get_as::<u64>("visits"), Some(2));
    }

    #[test]
    fn test_open_existing_never_creates() {
        let store = store();
        assert!(Session::open_existing(&store, SessionId::from("missing")).is_none());
        assert!(store.is_empty());

        Session::create(&store, SessionId::from("s1")).set("k", "v");
        let again = Session::open_existing(&store, SessionId::from("s1")).unwrap();
        assert_eq!(again.get("k"), Some(json!("v")));
    }

    #[test]
    fn test_clones_share_state() {
        let store = store();
        let a = Session::create(&store, SessionId::from("s1"));
        let b = a.clone();

        a.set("k", "v");
        assert_eq!(b.get("k"), Some(json!("v")));
    }

    #[test]
    fn test_open_keeps_values() {
        let store = store();
        let first = Session::create(&store, SessionId::from("s1"));
        first.set("k", "v");

        let again = Session::open(&store, SessionId::from("s1"));
        assert_eq!(again.get("k"), Some(json!("v")));
    }

    #[test]
    fn test_stale_handle_after_destroy() {
        let store = store();
        let session = Session::create(&store, SessionId::from("s1"));
        session.set("k", "v");
        store.destroy(session.id());

        assert!(!session.is_live());
        session.set("k", "again");
        assert_eq!(session.get("k"), None);
        assert_eq!(session.update("k", |_| json!(1)), None);
        assert!(store.is_empty());
    }
}

//! Named session backends.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::store::{MemoryStore, SharedStore};

/// Built-in backend factories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// [`MemoryStore`].
    Memory,
}

impl BackendKind {
    /// Every built-in backend.
    pub const ALL: [BackendKind; 1] = [BackendKind::Memory];

    /// Canonical registry name.
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
        }
    }

    /// Build a new, empty backend of this kind.
    pub fn build(self) -> SharedStore {
        match self {
            BackendKind::Memory => Arc::new(MemoryStore::new()),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            // "crimson" is the historical name of the in-memory provider
            "memory" | "crimson" => Ok(BackendKind::Memory),
            _ => Err(Error::UnknownProvider(s.to_string())),
        }
    }
}

/// Table of session backends keyed by name.
///
/// Filled once during startup and handed to
/// [`SessionManager::from_registry`](crate::SessionManager::from_registry),
/// which resolves its backend a single time.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, SharedStore>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding one instance of every built-in backend under its
    /// canonical name.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for kind in BackendKind::ALL {
            registry.providers.insert(kind.name().to_string(), kind.build());
        }
        registry
    }

    /// Register `store` under `name`.
    ///
    /// Fails if the name is empty or already taken. Both indicate a broken
    /// startup configuration and callers should not continue.
    pub fn register(&mut self, name: impl Into<String>, store: SharedStore) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            error!(name = %name, "Rejected session provider with empty name");
            return Err(Error::InvalidProviderName(name));
        }
        if self.providers.contains_key(&name) {
            error!(name = %name, "Session provider has already been registered");
            return Err(Error::DuplicateProvider(name));
        }
        debug!(name = %name, "Registered session provider");
        self.providers.insert(name, store);
        Ok(())
    }

    /// Resolve a backend by name.
    ///
    /// Exact names win; otherwise a built-in alias (such as `crimson`)
    /// resolves to its canonical entry.
    pub fn resolve(&self, name: &str) -> Result<SharedStore> {
        if let Some(store) = self.providers.get(name) {
            return Ok(Arc::clone(store));
        }
        let canonical = name.parse::<BackendKind>()?;
        self.providers
            .get(canonical.name())
            .map(Arc::clone)
            .ok_or_else(|| Error::UnknownProvider(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sid::SessionId;

    #[test]
    fn test_builtin_registry() {
        let registry = ProviderRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["memory".to_string()]);
        assert!(registry.resolve("memory").is_ok());
        assert!(registry.resolve("Crimson").is_ok());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = ProviderRegistry::new();
        registry
            .register("memory", BackendKind::Memory.build())
            .unwrap();

        let err = registry
            .register("memory", BackendKind::Memory.build())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateProvider(name) if name == "memory"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = ProviderRegistry::new();
        let err = registry
            .register("  ", BackendKind::Memory.build())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidProviderName(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ProviderRegistry::with_builtin();
        assert!(matches!(
            registry.resolve("redis"),
            Err(Error::UnknownProvider(name)) if name == "redis"
        ));
    }

    #[test]
    fn test_alias_needs_canonical_entry() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.resolve("memory"),
            Err(Error::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_resolve_returns_same_instance() {
        let mut registry = ProviderRegistry::new();
        registry.register("custom", BackendKind::Memory.build()).unwrap();

        let a = registry.resolve("custom").unwrap();
        let b = registry.resolve("custom").unwrap();
        a.init(&SessionId::from("shared"));

        assert!(b.contains(&SessionId::from("shared")));
    }
}

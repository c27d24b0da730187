//! Tab-scoped key/value storage
//!
//! Mirrors the browser's `sessionStorage`: string keys and values that live
//! as long as the tab. The CSRF state store and the redirect-mode callback
//! adapter both write through [`SessionStorage`].

use std::collections::HashMap;

use parking_lot::Mutex;

/// Synchronous string storage scoped to one browsing context
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String);

    /// Remove a key, returning the previous value
    fn remove(&self, key: &str) -> Option<String>;

    /// Remove `key` only while it still holds `expected`, in one step
    ///
    /// Returns whether this call removed it.
    fn remove_if(&self, key: &str, expected: &str) -> bool;
}

/// In-process storage backed by a mutex-guarded map
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.lock().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.entries.lock().remove(key)
    }

    fn remove_if(&self, key: &str, expected: &str) -> bool {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|value| value == expected) {
            entries.remove(key);
            true
        } else {
            false
        }
    }
}

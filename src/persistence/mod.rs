//! Persistent key/value store
//!
//! The game stores a handful of JSON documents under fixed keys. The backing
//! store may be missing or broken at any time (private browsing, quota), so
//! reads degrade to the caller's default and writes degrade to a no-op.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Storage keys
pub mod keys {
    pub const PROFILE: &str = "kq_profile";
    pub const PROGRESS: &str = "kq_progress";
    pub const SCORES: &str = "kq_scores";
    pub const QUESTIONS_SEEN: &str = "kq_questions_seen";
}

/// Raw string storage. Implementations must never panic.
pub trait KeyValueStore {
    /// Stored text for `key`, `None` when missing or unreadable
    fn read(&self, key: &str) -> Option<String>;
    /// Store text under `key`. Returns false if the store rejected it.
    fn write(&mut self, key: &str, value: &str) -> bool;
}

/// Decode the JSON stored under `key`, or return `default`
pub fn load<T, S>(store: &S, key: &str, default: T) -> T
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(json) = store.read(key) else {
        return default;
    };
    match serde_json::from_str(&json) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Ignoring corrupt {}: {}", key, e);
            default
        }
    }
}

/// Encode `value` as JSON under `key`; failures are logged and dropped
pub fn save<T, S>(store: &mut S, key: &str, value: &T)
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    match serde_json::to_string(value) {
        Ok(json) => {
            if !store.write(key, &json) {
                log::warn!("Could not persist {}", key);
            }
        }
        Err(e) => log::warn!("Could not encode {}: {}", key, e),
    }
}

/// In-memory store for native runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    /// Simulate an unavailable backend: reads miss, writes fail
    pub unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            entries: HashMap::new(),
            unavailable: true,
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        if self.unavailable {
            return None;
        }
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) -> bool {
        if self.unavailable {
            return false;
        }
        self.entries.insert(key.to_string(), value.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_defaults() {
        let mut store = MemoryStore::new();
        assert_eq!(load(&store, "k", vec![1u32]), vec![1]);

        save(&mut store, "k", &vec![4u32, 5]);
        assert_eq!(load(&store, "k", Vec::<u32>::new()), vec![4, 5]);

        store.write("k", "{not json");
        assert_eq!(load(&store, "k", 9u32), 9);
    }

    #[test]
    fn test_unavailable_store_is_harmless() {
        let mut store = MemoryStore::unavailable();
        save(&mut store, keys::SCORES, &3u32);
        assert_eq!(load(&store, keys::SCORES, 0u32), 0);
    }
}

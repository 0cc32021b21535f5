//! Platform abstraction layer
//!
//! Browser/native differences for:
//! - Storage (LocalStorage on web, in-memory elsewhere)
//! - Wall-clock time and run seeds

#[cfg(target_arch = "wasm32")]
use crate::persistence::KeyValueStore;
#[cfg(not(target_arch = "wasm32"))]
use crate::persistence::MemoryStore;

/// LocalStorage-backed store. Every call tolerates a missing or
/// throwing `window.localStorage`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStore;

#[cfg(target_arch = "wasm32")]
impl LocalStore {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStore {
    fn read(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn write(&mut self, key: &str, value: &str) -> bool {
        Self::storage()
            .map(|s| s.set_item(key, value).is_ok())
            .unwrap_or(false)
    }
}

/// The store used by the running game on this platform
#[cfg(target_arch = "wasm32")]
pub fn default_store() -> LocalStore {
    LocalStore
}

#[cfg(not(target_arch = "wasm32"))]
pub fn default_store() -> MemoryStore {
    MemoryStore::new()
}

/// Milliseconds since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Seed for question shuffling
pub fn run_seed() -> u64 {
    now_ms() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::KeyValueStore;

    #[test]
    fn test_native_store_round_trips() {
        let mut store = default_store();
        assert!(store.write("k", "v"));
        assert_eq!(store.read("k").as_deref(), Some("v"));
        assert!(now_ms() > 0.0);
    }
}

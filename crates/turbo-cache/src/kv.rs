//! JSON values over a key/value store.

use crate::CacheError;
use serde::{de::DeserializeOwned, Serialize};

#[cfg(not(target_arch = "wasm32"))]
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock, RwLock},
};

#[cfg(not(target_arch = "wasm32"))]
type MemoryEntries = Arc<RwLock<HashMap<String, Vec<u8>>>>;

/// Typed handle to a key/value store.
///
/// Inside Spin this is a Key-Value Store opened by label. Elsewhere it is a
/// process-local map: handles opened with the same label share entries,
/// and [`Cache::in_memory`] creates a private one.
#[cfg_attr(not(target_arch = "wasm32"), derive(Clone))]
pub struct Cache {
    #[cfg(target_arch = "wasm32")]
    store: spin_sdk::key_value::Store,
    #[cfg(not(target_arch = "wasm32"))]
    entries: MemoryEntries,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").finish_non_exhaustive()
    }
}

impl Cache {
    /// Read and decode the value under `key`.
    ///
    /// ```rust,ignore
    /// let record: Option<SessionData> = cache.get("session:sess_abc")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.get_bytes(key)?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(CacheError::from)
    }

    /// Encode `value` as JSON and store it under `key`.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.set_bytes(key, serde_json::to_vec(value)?)
    }
}

#[cfg(target_arch = "wasm32")]
impl Cache {
    /// Open the store labelled `default`.
    pub fn open_default() -> Result<Self, CacheError> {
        Self::connect(spin_sdk::key_value::Store::open_default())
    }

    pub fn open(label: &str) -> Result<Self, CacheError> {
        Self::connect(spin_sdk::key_value::Store::open(label))
    }

    fn connect(
        store: Result<spin_sdk::key_value::Store, spin_sdk::key_value::Error>,
    ) -> Result<Self, CacheError> {
        store
            .map(|store| Self { store })
            .map_err(|e| CacheError::OpenError(e.to_string()))
    }

    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.delete(key).map_err(store_error)
    }

    pub fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.store.exists(key).map_err(store_error)
    }

    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.store.get(key).map_err(store_error)
    }

    fn set_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        self.store.set(key, &bytes).map_err(store_error)
    }
}

#[cfg(target_arch = "wasm32")]
fn store_error(e: spin_sdk::key_value::Error) -> CacheError {
    CacheError::StoreError(e.to_string())
}

#[cfg(not(target_arch = "wasm32"))]
impl Cache {
    pub fn open_default() -> Result<Self, CacheError> {
        Self::open("default")
    }

    pub fn open(label: &str) -> Result<Self, CacheError> {
        static STORES: OnceLock<Mutex<HashMap<String, MemoryEntries>>> = OnceLock::new();

        let mut stores = STORES
            .get_or_init(Default::default)
            .lock()
            .map_err(|_| CacheError::OpenError(format!("store registry poisoned: {}", label)))?;
        let entries = Arc::clone(stores.entry(label.to_string()).or_default());
        Ok(Self { entries })
    }

    /// A private store that shares nothing with labelled ones.
    pub fn in_memory() -> Self {
        Self {
            entries: MemoryEntries::default(),
        }
    }

    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    pub fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.entries.read().map_err(poisoned)?.contains_key(key))
    }

    fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.read().map_err(poisoned)?.get(key).cloned())
    }

    fn set_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        self.entries
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), bytes);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn poisoned<T>(_: T) -> CacheError {
    CacheError::StoreError("cache lock poisoned".to_string())
}

/// Join a namespace and parts with `:`.
///
/// ```rust,ignore
/// let key = cache_key!("session", session_id); // "session:sess_abc"
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

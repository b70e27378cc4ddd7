//! Per-user session values kept in the cache.

use crate::{cache_key, Cache, CacheError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque session identifier, usually taken from a cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random ID: `sess_` followed by 18 random bytes, URL-safe base64.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::RngCore;

        let mut bytes = [0u8; 18];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::new(format!("sess_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Everything stored for one session, under `session:<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub id: SessionId,
    #[serde(default)]
    pub values: Map<String, Value>,
    /// Unix seconds.
    pub created_at: u64,
    /// Unix seconds of the last write.
    pub last_accessed: u64,
}

/// Key/value store scoped to one user session.
///
/// Every call reads the session record from the cache and every write
/// stores the whole record back; concurrent writers to the same session
/// follow last-writer-wins.
///
/// # Example
///
/// ```rust,ignore
/// use turbo_cache::{Cache, Session, SessionId};
///
/// let session = Session::open(Cache::open_default()?, SessionId::from("abc123"));
/// session.put("cart.session", serde_json::json!({}))?;
/// let cart = session.get("cart.session")?;
/// ```
#[derive(Debug)]
pub struct Session {
    cache: Cache,
    id: SessionId,
}

impl Session {
    /// Bind a session manager to an existing session ID.
    pub fn open(cache: Cache, id: SessionId) -> Self {
        Self { cache, id }
    }

    /// Start a fresh session with a generated ID.
    pub fn start(cache: Cache) -> Self {
        Self::open(cache, SessionId::generate())
    }

    /// The ID this session is bound to.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Get a value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self
            .load()?
            .and_then(|mut record| record.values.remove(key)))
    }

    /// Check whether a value is stored under `key`.
    pub fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self
            .load()?
            .is_some_and(|record| record.values.contains_key(key)))
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn put(&self, key: &str, value: Value) -> Result<(), CacheError> {
        let mut record = self.load_or_new()?;
        record.values.insert(key.to_string(), value);
        self.save(record)
    }

    /// Remove the value stored under `key`.
    pub fn forget(&self, key: &str) -> Result<(), CacheError> {
        if let Some(mut record) = self.load()? {
            if record.values.remove(key).is_some() {
                self.save(record)?;
            }
        }
        Ok(())
    }

    /// Delete the whole session record.
    pub fn flush(&self) -> Result<(), CacheError> {
        tracing::debug!(session = %self.id, "flushing session");
        self.cache.delete(&self.session_key())
    }

    fn load(&self) -> Result<Option<SessionData>, CacheError> {
        self.cache.get::<SessionData>(&self.session_key())
    }

    fn load_or_new(&self) -> Result<SessionData, CacheError> {
        Ok(self.load()?.unwrap_or_else(|| {
            let now = current_timestamp();
            SessionData {
                id: self.id.clone(),
                values: Map::new(),
                created_at: now,
                last_accessed: now,
            }
        }))
    }

    fn save(&self, mut record: SessionData) -> Result<(), CacheError> {
        record.last_accessed = current_timestamp();
        self.cache.set(&self.session_key(), &record)
    }

    fn session_key(&self) -> String {
        cache_key!("session", self.id)
    }
}

fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

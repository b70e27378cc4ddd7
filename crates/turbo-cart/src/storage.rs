//! Where carts are kept between calls.
//!
//! The store reads the whole cart from a [`CartStorage`] at the start of every
//! operation and writes the whole cart back after every mutation.

use crate::error::CartError;
use serde::Deserialize;
use serde_json::Value;
use turbo_cache::Session;
use turbo_db::{params, Db};

/// Key/value persistence for carts, scoped to one user.
pub trait CartStorage: Send + Sync {
    /// Value stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<Value>, CartError>;

    /// Replace the value stored under `key`.
    fn store(&self, key: &str, value: Value) -> Result<(), CartError>;
}

impl<S: CartStorage + ?Sized> CartStorage for Box<S> {
    fn load(&self, key: &str) -> Result<Option<Value>, CartError> {
        (**self).load(key)
    }

    fn store(&self, key: &str, value: Value) -> Result<(), CartError> {
        (**self).store(key, value)
    }
}

/// Carts kept in the user's session.
#[derive(Debug)]
pub struct SessionStorage {
    session: Session,
}

impl SessionStorage {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl CartStorage for SessionStorage {
    fn load(&self, key: &str) -> Result<Option<Value>, CartError> {
        Ok(self.session.get(key)?)
    }

    fn store(&self, key: &str, value: Value) -> Result<(), CartError> {
        Ok(self.session.put(key, value)?)
    }
}

/// Schema of the table backing [`DatabaseStorage`].
pub const CART_STORAGE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cart_storage (
    session_id TEXT NOT NULL,
    key TEXT NOT NULL,
    content TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (session_id, key)
)";

const SELECT_CART: &str = "SELECT content FROM cart_storage WHERE session_id = ? AND key = ?";

const UPSERT_CART: &str = "INSERT INTO cart_storage (session_id, key, content, updated_at)
    VALUES (?, ?, ?, ?)
    ON CONFLICT (session_id, key)
    DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at";

#[derive(Debug, Deserialize)]
struct StoredCart {
    content: String,
}

/// Carts kept in the `cart_storage` SQLite table, one row per
/// session and cart key.
#[derive(Debug)]
pub struct DatabaseStorage {
    db: Db,
    session_id: String,
}

impl DatabaseStorage {
    pub fn new(db: Db, session_id: impl Into<String>) -> Self {
        Self {
            db,
            session_id: session_id.into(),
        }
    }

    /// Open the default database for a session.
    pub fn open_default(session_id: impl Into<String>) -> Result<Self, CartError> {
        Ok(Self::new(Db::open_default()?, session_id))
    }

    /// Create the `cart_storage` table if it does not exist.
    pub fn migrate(&self) -> Result<(), CartError> {
        self.db.execute(CART_STORAGE_SCHEMA, params![])?;
        Ok(())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl CartStorage for DatabaseStorage {
    fn load(&self, key: &str) -> Result<Option<Value>, CartError> {
        let stored: Option<StoredCart> = self
            .db
            .query_optional(SELECT_CART, params![self.session_id.as_str(), key])?;
        decode_content(stored)
    }

    fn store(&self, key: &str, value: Value) -> Result<(), CartError> {
        let content = serde_json::to_string(&value)?;
        self.db.execute(
            UPSERT_CART,
            params![self.session_id.as_str(), key, content, current_timestamp()],
        )?;
        Ok(())
    }
}

fn decode_content(stored: Option<StoredCart>) -> Result<Option<Value>, CartError> {
    stored
        .map(|row| serde_json::from_str(&row.content))
        .transpose()
        .map_err(CartError::from)
}

fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

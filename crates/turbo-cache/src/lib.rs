//! Key/value storage for TurboCommerce components.
//!
//! [`Cache`] stores JSON-encoded values in Spin's Key-Value Store (or a
//! process-local map outside Spin). [`Session`] layers a per-user value map
//! on top of it, which is where carts live by default.
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_cache::{Cache, Session, SessionId};
//!
//! let cache = Cache::open_default()?;
//!
//! // Typed values
//! cache.set("feature:flags", &flags)?;
//! let flags: Option<Flags> = cache.get("feature:flags")?;
//!
//! // Session-scoped values
//! let session = Session::open(cache, SessionId::from("sess_abc"));
//! session.put("cart.session", serde_json::json!({}))?;
//! ```

mod error;
mod kv;
mod session;

pub use error::CacheError;
pub use kv::Cache;
pub use session::{Session, SessionData, SessionId};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Cache, CacheError, Session, SessionId};
}

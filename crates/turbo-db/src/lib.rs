//! SQLite access for TurboCommerce components running on Spin.
//!
//! Statements take positional `?` parameters built with [`params!`]; query
//! rows deserialize into any serde type whose fields match the column names.
//!
//! ```rust,ignore
//! use serde::Deserialize;
//! use turbo_db::{params, Db};
//!
//! #[derive(Deserialize)]
//! struct StoredCart {
//!     content: String,
//! }
//!
//! let db = Db::open_default()?;
//! let stored: Option<StoredCart> = db.query_optional(
//!     "SELECT content FROM cart_storage WHERE session_id = ? AND key = ?",
//!     params!["sess_abc", "cart.session"],
//! )?;
//! ```

mod db;
mod error;
mod types;

pub use db::Db;
pub use error::DbError;
pub use types::{QueryResult, Row, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{params, Db, DbError, QueryResult, Row, Value};
}

/// Build a `&[Value]` parameter list; each argument goes through `Value::from`.
#[macro_export]
macro_rules! params {
    () => {
        &[] as &[$crate::Value]
    };
    ($($param:expr),+ $(,)?) => {
        &[$($crate::Value::from($param)),+]
    };
}

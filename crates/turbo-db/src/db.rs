//! Connection handle and statement execution.

use crate::{DbError, QueryResult, Value};
use serde::de::DeserializeOwned;

/// Handle to a Spin SQLite database.
///
/// Outside the Spin runtime a handle can still be opened, but every
/// statement fails with [`DbError::Unavailable`].
pub struct Db {
    #[cfg(target_arch = "wasm32")]
    conn: spin_sdk::sqlite::Connection,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").finish_non_exhaustive()
    }
}

#[cfg(target_arch = "wasm32")]
impl Db {
    /// Open the database labelled `default` in the component manifest.
    pub fn open_default() -> Result<Self, DbError> {
        Self::connect(spin_sdk::sqlite::Connection::open_default())
    }

    pub fn open(label: &str) -> Result<Self, DbError> {
        Self::connect(spin_sdk::sqlite::Connection::open(label))
    }

    fn connect(
        conn: Result<spin_sdk::sqlite::Connection, spin_sdk::sqlite::Error>,
    ) -> Result<Self, DbError> {
        conn.map(|conn| Self { conn })
            .map_err(|e| DbError::OpenError(e.to_string()))
    }

    /// Run a statement and discard any rows, e.g. DDL or an upsert.
    ///
    /// ```rust,ignore
    /// db.execute(
    ///     "DELETE FROM cart_storage WHERE session_id = ?",
    ///     params!["sess_abc"],
    /// )?;
    /// ```
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<(), DbError> {
        self.run(sql, params).map(drop)
    }

    /// Run a query and collect its rows.
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult, DbError> {
        let result = self.run(sql, params)?;
        let rows = result
            .rows
            .into_iter()
            .map(|row| row.values.into_iter().map(Value::from).collect())
            .collect();
        Ok(QueryResult::new(result.columns, rows))
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<spin_sdk::sqlite::QueryResult, DbError> {
        let params: Vec<spin_sdk::sqlite::Value> = params.iter().cloned().map(Into::into).collect();
        self.conn
            .execute(sql, &params)
            .map_err(|e| DbError::QueryError(e.to_string()))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Db {
    pub fn open_default() -> Result<Self, DbError> {
        Ok(Self {})
    }

    pub fn open(_label: &str) -> Result<Self, DbError> {
        Ok(Self {})
    }

    pub fn execute(&self, _sql: &str, _params: &[Value]) -> Result<(), DbError> {
        Err(DbError::Unavailable)
    }

    pub fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult, DbError> {
        Err(DbError::Unavailable)
    }
}

impl Db {
    /// Run a query and deserialize its first row, if any.
    ///
    /// ```rust,ignore
    /// let stored: Option<StoredCart> = db.query_optional(
    ///     "SELECT content FROM cart_storage WHERE session_id = ? AND key = ?",
    ///     params!["sess_abc", "cart.session"],
    /// )?;
    /// ```
    pub fn query_optional<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<T>, DbError> {
        self.query(sql, params)?.first_as()
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_native_statements_are_unavailable() {
        let db = Db::open("carts").unwrap();

        assert!(matches!(
            db.execute("DELETE FROM cart_storage WHERE session_id = ?", params!["s1"]),
            Err(DbError::Unavailable)
        ));
        assert!(matches!(
            db.query_optional::<serde_json::Value>("SELECT 1", params![]),
            Err(DbError::Unavailable)
        ));
    }
}

//! Database errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// The labelled database could not be opened.
    #[error("Failed to open database: {0}")]
    OpenError(String),

    /// SQLite rejected or failed a statement.
    #[error("Query execution failed: {0}")]
    QueryError(String),

    /// A row did not match the requested type.
    #[error("Deserialization error: {0}")]
    DeserializeError(String),

    /// SQLite is only reachable inside the Spin runtime.
    #[error("SQLite is not available outside the Spin runtime")]
    Unavailable,
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::DeserializeError(e.to_string())
    }
}

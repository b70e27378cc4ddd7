//! Cart error types.

use thiserror::Error;

/// Errors that can occur in cart operations.
///
/// Validation errors are raised before the cart is read back or written,
/// so a failed call never leaves a partial mutation behind.
#[derive(Error, Debug)]
pub enum CartError {
    /// Model type name is not registered.
    #[error("Invalid model name '{0}'")]
    InvalidModel(String),

    /// Quantity below one on insert.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Price negative or not a finite number.
    #[error("Invalid price: {0}")]
    InvalidPrice(f64),

    /// No row with this raw ID.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// A field update carried a value of the wrong type.
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// A notifier rejected an event.
    #[error("Notifier error: {0}")]
    Notifier(String),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored cart could not be decoded or encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<turbo_cache::CacheError> for CartError {
    fn from(e: turbo_cache::CacheError) -> Self {
        CartError::Storage(e.to_string())
    }
}

impl From<turbo_db::DbError> for CartError {
    fn from(e: turbo_db::DbError) -> Self {
        CartError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CartError {
    fn from(e: serde_json::Error) -> Self {
        CartError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for CartError {
    fn from(e: toml::de::Error) -> Self {
        CartError::Config(e.to_string())
    }
}

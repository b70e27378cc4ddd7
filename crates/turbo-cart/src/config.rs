//! Cart configuration.

use crate::error::CartError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which backend keeps the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StorageKind {
    /// The user's session (`turbo-cache`).
    #[default]
    Session,
    /// The `cart_storage` SQLite table (`turbo-db`).
    Database,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Session => "session",
            StorageKind::Database => "database",
        }
    }
}

impl From<&str> for StorageKind {
    /// Unrecognized names select the session backend.
    fn from(name: &str) -> Self {
        match name {
            "database" => StorageKind::Database,
            "session" => StorageKind::Session,
            other => {
                tracing::warn!(storage = other, "unknown cart storage, using session");
                StorageKind::Session
            }
        }
    }
}

impl From<String> for StorageKind {
    fn from(name: String) -> Self {
        StorageKind::from(name.as_str())
    }
}

impl From<StorageKind> for String {
    fn from(kind: StorageKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cart settings.
///
/// ```toml
/// storage = "session"
/// name = "wishlist"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartConfig {
    /// Backend keeping the cart.
    #[serde(default)]
    pub storage: StorageKind,

    /// Cart name; the storage key becomes `cart.<name>`. Unset uses
    /// `cart.session`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CartConfig {
    /// Parse from TOML.
    pub fn from_toml(content: &str) -> Result<Self, CartError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse from JSON.
    pub fn from_json(content: &str) -> Result<Self, CartError> {
        serde_json::from_str(content).map_err(|e| CartError::Config(e.to_string()))
    }

    /// Load from a file; `.json` files are JSON, anything else TOML.
    pub fn load(path: &str) -> Result<Self, CartError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CartError::Config(format!("Failed to read config file {}: {}", path, e)))?;

        if path.ends_with(".json") {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        }
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

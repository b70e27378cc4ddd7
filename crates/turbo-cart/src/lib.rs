//! Session-scoped shopping cart for TurboCommerce.
//!
//! - **Cart store**: add, update, remove, search and total cart rows
//! - **Row identity**: rows are keyed by a fingerprint of the product ID and
//!   its attributes, so repeated adds of the same configuration merge
//! - **Events**: a notifier is called before and after every mutation
//! - **Storage**: the user's session (`turbo-cache`) or SQLite (`turbo-db`)
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_cache::{Cache, Session, SessionId};
//! use turbo_cart::prelude::*;
//!
//! let session = Session::open(Cache::open_default()?, SessionId::from("sess_abc"));
//! let store = CartStore::from_config(&CartConfig::default(), session)?
//!     .with_notifier(TracingNotifier);
//!
//! let row = store.add("sku-1", "Rust Mug", 2, 12.5, Attributes::new())?;
//! assert_eq!(row.total(), 25.0);
//!
//! store.update(row.raw_id(), 0)?; // removes the row
//! assert!(store.is_empty()?);
//! ```

pub mod cart;
pub mod config;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod ids;
pub mod model;
pub mod storage;
pub mod store;

pub use cart::{Attributes, Cart, LineItem};
pub use config::{CartConfig, StorageKind};
pub use error::CartError;
pub use events::{
    CartEvent, CartNotifier, EventPayload, EventPhase, EventSubject, FnNotifier, NoopNotifier,
    TracingNotifier,
};
pub use fingerprint::fingerprint;
pub use ids::{ProductId, RawId};
pub use model::{ModelRegistry, ModelResolver};
pub use storage::{CartStorage, DatabaseStorage, SessionStorage, CART_STORAGE_SCHEMA};
pub use store::{CartStore, CartUpdate, DEFAULT_CART_KEY};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::cart::{Attributes, Cart, LineItem};
    pub use crate::config::{CartConfig, StorageKind};
    pub use crate::error::CartError;
    pub use crate::events::{CartEvent, CartNotifier, EventPayload, NoopNotifier, TracingNotifier};
    pub use crate::ids::{ProductId, RawId};
    pub use crate::model::{ModelRegistry, ModelResolver};
    pub use crate::storage::{CartStorage, DatabaseStorage, SessionStorage};
    pub use crate::store::{CartStore, CartUpdate};
}

//! Lazy lookup of richer product records for cart rows.

use crate::ids::ProductId;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Finds a record of one model type by product ID.
pub trait ModelResolver: Send + Sync {
    /// Return the record for `id`, or `None` if there is none.
    fn find(&self, id: &ProductId) -> Option<Value>;
}

impl<F> ModelResolver for F
where
    F: Fn(&ProductId) -> Option<Value> + Send + Sync,
{
    fn find(&self, id: &ProductId) -> Option<Value> {
        self(id)
    }
}

/// Model type names a cart may be associated with.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    resolvers: HashMap<String, Arc<dyn ModelResolver>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver under a model type name such as `"shop::Product"`.
    pub fn register(&mut self, name: impl Into<String>, resolver: impl ModelResolver + 'static) {
        self.resolvers.insert(name.into(), Arc::new(resolver));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, name: impl Into<String>, resolver: impl ModelResolver + 'static) -> Self {
        self.register(name, resolver);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolvers.contains_key(name)
    }

    pub fn resolver(&self, name: &str) -> Option<&dyn ModelResolver> {
        self.resolvers.get(name).map(|r| r.as_ref())
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.resolvers.keys().collect();
        names.sort();
        f.debug_struct("ModelRegistry").field("models", &names).finish()
    }
}

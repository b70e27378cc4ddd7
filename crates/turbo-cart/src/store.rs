//! The cart store: every cart query and mutation.

use crate::cart::{Attributes, Cart, LineItem};
use crate::config::{CartConfig, StorageKind};
use crate::error::CartError;
use crate::events::{CartEvent, CartNotifier, EventPayload, EventSubject, NoopNotifier};
use crate::fingerprint::fingerprint;
use crate::ids::{ProductId, RawId};
use crate::model::ModelRegistry;
use crate::storage::{CartStorage, DatabaseStorage, SessionStorage};
use serde_json::{Map, Value};
use std::fmt;
use turbo_cache::Session;

/// Storage key used when no cart name is set.
pub const DEFAULT_CART_KEY: &str = "cart.session";

/// Change applied by [`CartStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum CartUpdate {
    /// New quantity; zero or less removes the row.
    Quantity(i64),
    /// Partial field update. `name`, `qty`, `price` and `id` set the typed
    /// fields, `raw_id`, `total` and `model` are read-only, every other key
    /// is merged into the attributes.
    ///
    /// The row keeps its raw ID even when `id` or attributes change, so it no
    /// longer matches the fingerprint of its new configuration: a later
    /// `add` of that configuration inserts a separate row.
    Fields(Map<String, Value>),
}

impl From<i64> for CartUpdate {
    fn from(qty: i64) -> Self {
        CartUpdate::Quantity(qty)
    }
}

impl From<i32> for CartUpdate {
    fn from(qty: i32) -> Self {
        CartUpdate::Quantity(qty.into())
    }
}

impl From<Map<String, Value>> for CartUpdate {
    fn from(fields: Map<String, Value>) -> Self {
        CartUpdate::Fields(fields)
    }
}

/// Validated field changes, applied only after every field checked out.
#[derive(Debug, Default)]
struct FieldChanges {
    id: Option<ProductId>,
    name: Option<String>,
    qty: Option<i64>,
    price: Option<f64>,
    attributes: Vec<(String, Value)>,
}

impl FieldChanges {
    fn parse(update: CartUpdate) -> Result<Self, CartError> {
        let fields = match update {
            CartUpdate::Quantity(qty) => {
                return Ok(Self {
                    qty: Some(qty),
                    ..Self::default()
                })
            }
            CartUpdate::Fields(fields) => fields,
        };

        let mut changes = Self::default();
        for (key, value) in fields {
            match key.as_str() {
                "qty" => {
                    changes.qty = Some(value.as_i64().ok_or_else(|| invalid_field(&key, "expected an integer"))?);
                }
                "price" => {
                    let price = value.as_f64().ok_or_else(|| invalid_field(&key, "expected a number"))?;
                    changes.price = Some(validate_price(price)?);
                }
                "name" => match value {
                    Value::String(name) => changes.name = Some(name),
                    _ => return Err(invalid_field(&key, "expected a string")),
                },
                "id" => match value {
                    Value::String(id) => changes.id = Some(ProductId::new(id)),
                    Value::Number(id) => changes.id = Some(ProductId::new(id.to_string())),
                    _ => return Err(invalid_field(&key, "expected a string or number")),
                },
                "raw_id" | "total" | "model" => {
                    tracing::warn!(field = %key, "ignoring update of read-only cart field");
                }
                _ => changes.attributes.push((key, value)),
            }
        }
        Ok(changes)
    }

    /// Reject changes whose resulting line total is not finite.
    fn check_total(&self, item: &LineItem) -> Result<(), CartError> {
        let qty = self.qty.unwrap_or(item.qty());
        match self.price {
            Some(price) => validate_line_total(qty, price, CartError::InvalidPrice(price)),
            None => validate_line_total(qty, item.price(), CartError::InvalidQuantity(qty)),
        }
    }

    fn apply(self, item: &mut LineItem) {
        if let Some(id) = self.id {
            item.set_id(id);
        }
        if let Some(name) = self.name {
            item.set_name(name);
        }
        for (key, value) in self.attributes {
            item.set_attribute(key, value);
        }
        if let Some(price) = self.price {
            item.set_price(price);
        }
        if let Some(qty) = self.qty {
            item.set_qty(qty);
        }
    }
}

fn invalid_field(field: &str, reason: &str) -> CartError {
    CartError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_qty(qty: i64) -> Result<i64, CartError> {
    if qty < 1 {
        return Err(CartError::InvalidQuantity(qty));
    }
    Ok(qty)
}

fn validate_price(price: f64) -> Result<f64, CartError> {
    if !price.is_finite() || price < 0.0 {
        return Err(CartError::InvalidPrice(price));
    }
    Ok(price)
}

/// A non-finite total cannot be stored and read back.
fn validate_line_total(qty: i64, price: f64, err: CartError) -> Result<(), CartError> {
    if (qty as f64 * price).is_finite() {
        Ok(())
    } else {
        Err(err)
    }
}

/// Session-scoped shopping cart.
///
/// The store keeps no cart in memory: every call loads the cart from its
/// storage, and every mutation writes the whole cart back as its last step.
///
/// # Example
///
/// ```rust,ignore
/// use turbo_cart::prelude::*;
///
/// let store = CartStore::new(SessionStorage::new(session))
///     .with_notifier(TracingNotifier);
///
/// let mut attributes = Attributes::new();
/// attributes.insert("color".into(), "red".into());
/// let row = store.add("sku-1", "T-shirt", 2, 19.99, attributes)?;
///
/// store.update(row.raw_id(), 3)?;
/// println!("{} items, total {}", store.count(true)?, store.total()?);
/// ```
pub struct CartStore {
    storage: Box<dyn CartStorage>,
    notifier: Box<dyn CartNotifier>,
    models: ModelRegistry,
    key: String,
    model: Option<String>,
}

impl CartStore {
    /// Create a store over `storage` using the default cart key and no
    /// notifications.
    pub fn new(storage: impl CartStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            notifier: Box::new(NoopNotifier),
            models: ModelRegistry::new(),
            key: DEFAULT_CART_KEY.to_string(),
            model: None,
        }
    }

    /// Create a store for a session, with the backend picked by `config`.
    pub fn from_config(config: &CartConfig, session: Session) -> Result<Self, CartError> {
        let mut store = match config.storage {
            StorageKind::Session => Self::new(SessionStorage::new(session)),
            StorageKind::Database => {
                let storage = DatabaseStorage::open_default(session.id().as_str())?;
                storage.migrate()?;
                Self::new(storage)
            }
        };
        if let Some(name) = &config.name {
            store.set_name(name);
        }
        tracing::debug!(storage = %config.storage, key = %store.key, "cart store ready");
        Ok(store)
    }

    pub fn with_notifier(mut self, notifier: impl CartNotifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Model types available to [`associate_model`](Self::associate_model).
    pub fn with_models(mut self, models: ModelRegistry) -> Self {
        self.models = models;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.set_name(name);
        self
    }

    /// Switch to the cart named `name`, stored under `cart.<name>`.
    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.key = format!("cart.{}", name);
        self
    }

    /// Current storage key.
    pub fn name(&self) -> &str {
        &self.key
    }

    /// Associate a registered model type; rows added afterwards carry it.
    pub fn associate_model(&mut self, model: &str) -> Result<&mut Self, CartError> {
        if !self.models.contains(model) {
            return Err(CartError::InvalidModel(model.to_string()));
        }
        self.model = Some(model.to_string());
        Ok(self)
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// Resolve a row's linked model through this store's registry.
    pub fn linked_model(&self, item: &LineItem, property: &str) -> Option<Value> {
        item.resolve_linked_model(&self.models, property)
    }

    /// Row with this raw ID, if present.
    pub fn get(&self, raw_id: &RawId) -> Result<Option<LineItem>, CartError> {
        Ok(self.load()?.get(raw_id).cloned())
    }

    /// Full cart contents in insertion order.
    pub fn all(&self) -> Result<Cart, CartError> {
        self.load()
    }

    /// Add `qty` of a product configuration.
    ///
    /// A row with the same product ID and attribute set gains the quantity;
    /// otherwise a new row is inserted. Returns the resulting row.
    pub fn add(
        &self,
        id: impl Into<ProductId>,
        name: impl Into<String>,
        qty: i64,
        price: f64,
        attributes: Attributes,
    ) -> Result<LineItem, CartError> {
        let qty = validate_qty(qty)?;
        let price = validate_price(price)?;
        let id = id.into();

        let mut cart = self.load()?;
        let before = cart.clone();
        let raw_id = fingerprint(&id, &attributes);

        let merged = match cart.get(&raw_id) {
            Some(existing) => {
                let merged = existing
                    .qty()
                    .checked_add(qty)
                    .ok_or(CartError::InvalidQuantity(qty))?;
                validate_line_total(merged, existing.price(), CartError::InvalidQuantity(qty))?;
                Some(merged)
            }
            None => {
                validate_line_total(qty, price, CartError::InvalidPrice(price))?;
                None
            }
        };

        self.notify(CartEvent::Adding, EventSubject::Attributes(&attributes), &before)?;

        let row = match merged {
            Some(merged) => {
                let existing = cart
                    .get_mut(&raw_id)
                    .ok_or_else(|| CartError::ItemNotFound(raw_id.to_string()))?;
                existing.set_qty(merged);
                existing.clone()
            }
            None => {
                let item = LineItem::new(
                    raw_id,
                    id,
                    name.into(),
                    qty,
                    price,
                    attributes.clone(),
                    self.model.clone(),
                );
                cart.put(item.clone());
                item
            }
        };

        self.notify(CartEvent::Added, EventSubject::Attributes(&attributes), &before)?;
        self.save(&cart)?;

        tracing::debug!(key = %self.key, raw_id = %row.raw_id(), qty = row.qty(), "cart row added");
        Ok(row)
    }

    /// Change a row's quantity or fields.
    ///
    /// A resulting quantity of zero or less removes the row; the row as it
    /// was before removal is returned.
    pub fn update(&self, raw_id: &RawId, change: impl Into<CartUpdate>) -> Result<LineItem, CartError> {
        let mut cart = self.load()?;
        let existing = cart
            .get(raw_id)
            .cloned()
            .ok_or_else(|| CartError::ItemNotFound(raw_id.to_string()))?;
        let changes = FieldChanges::parse(change.into())?;
        let removes_row = matches!(changes.qty, Some(qty) if qty <= 0);
        if !removes_row {
            changes.check_total(&existing)?;
        }

        self.notify(CartEvent::Updating, EventSubject::Item(&existing), &cart)?;

        let row = if removes_row {
            self.remove_row(&mut cart, &existing)?;
            existing.clone()
        } else {
            let item = cart
                .get_mut(raw_id)
                .ok_or_else(|| CartError::ItemNotFound(raw_id.to_string()))?;
            changes.apply(item);
            item.clone()
        };

        self.notify(CartEvent::Updated, EventSubject::Item(&existing), &cart)?;
        self.save(&cart)?;

        tracing::debug!(key = %self.key, raw_id = %raw_id, qty = row.qty(), "cart row updated");
        Ok(row)
    }

    /// Set a row's quantity; zero or less removes it.
    pub fn update_quantity(&self, raw_id: &RawId, qty: i64) -> Result<LineItem, CartError> {
        self.update(raw_id, CartUpdate::Quantity(qty))
    }

    /// Merge `fields` into a row.
    pub fn update_fields(&self, raw_id: &RawId, fields: Map<String, Value>) -> Result<LineItem, CartError> {
        self.update(raw_id, CartUpdate::Fields(fields))
    }

    /// Remove a row. Removing a missing row succeeds without changes.
    pub fn remove(&self, raw_id: &RawId) -> Result<bool, CartError> {
        let mut cart = self.load()?;
        let Some(existing) = cart.get(raw_id).cloned() else {
            return Ok(true);
        };

        self.remove_row(&mut cart, &existing)?;
        self.save(&cart)?;
        Ok(true)
    }

    fn remove_row(&self, cart: &mut Cart, row: &LineItem) -> Result<(), CartError> {
        self.notify(CartEvent::Removing, EventSubject::Item(row), cart)?;
        cart.forget(row.raw_id());
        self.notify(CartEvent::Removed, EventSubject::Item(row), cart)?;

        tracing::debug!(key = %self.key, raw_id = %row.raw_id(), "cart row removed");
        Ok(())
    }

    /// Empty the cart.
    pub fn destroy(&self) -> Result<(), CartError> {
        let before = self.load()?;
        self.notify(CartEvent::Destroying, EventSubject::Cart, &before)?;

        let emptied = Cart::new();
        self.notify(CartEvent::Destroyed, EventSubject::Cart, &emptied)?;
        self.save(&emptied)?;

        tracing::debug!(key = %self.key, rows = before.len(), "cart destroyed");
        Ok(())
    }

    /// Alias of [`destroy`](Self::destroy).
    pub fn clean(&self) -> Result<(), CartError> {
        self.destroy()
    }

    /// Sum of `qty * price` over all rows.
    pub fn total(&self) -> Result<f64, CartError> {
        self.total_price()
    }

    pub fn total_price(&self) -> Result<f64, CartError> {
        Ok(self.load()?.total_price())
    }

    /// Total units when `total_items` is true, otherwise distinct rows.
    pub fn count(&self, total_items: bool) -> Result<i64, CartError> {
        let cart = self.load()?;
        if total_items {
            Ok(cart.quantity())
        } else {
            Ok(cart.len() as i64)
        }
    }

    pub fn count_rows(&self) -> Result<i64, CartError> {
        self.count(false)
    }

    pub fn is_empty(&self) -> Result<bool, CartError> {
        Ok(self.count(true)? <= 0)
    }

    /// Rows whose fields hold every requested value.
    ///
    /// Empty criteria return an empty cart, not every row.
    pub fn search(&self, criteria: &Map<String, Value>) -> Result<Cart, CartError> {
        Ok(self.load()?.search(criteria))
    }

    fn load(&self) -> Result<Cart, CartError> {
        tracing::trace!(key = %self.key, "loading cart");
        Cart::from_stored(self.storage.load(&self.key)?)
    }

    fn save(&self, cart: &Cart) -> Result<(), CartError> {
        tracing::trace!(key = %self.key, rows = cart.len(), "saving cart");
        self.storage.store(&self.key, cart.to_stored()?)
    }

    fn notify(&self, event: CartEvent, subject: EventSubject<'_>, cart: &Cart) -> Result<(), CartError> {
        let payload = EventPayload {
            key: &self.key,
            subject,
            cart,
        };
        self.notifier.notify(event, &payload)
    }
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.key)
            .field("model", &self.model)
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FnNotifier;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use turbo_cache::{Cache, SessionId};

    fn session(cache: &Cache) -> Session {
        Session::open(cache.clone(), SessionId::new("sess-test"))
    }

    fn store() -> CartStore {
        CartStore::new(SessionStorage::new(session(&Cache::in_memory())))
    }

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => Attributes::new(),
        }
    }

    fn criteria(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    /// Records event names and the row count of each payload's cart.
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(&'static str, usize)>>,
    }

    impl CartNotifier for Recorder {
        fn notify(&self, event: CartEvent, payload: &EventPayload<'_>) -> Result<(), CartError> {
            self.events
                .lock()
                .unwrap()
                .push((event.name(), payload.cart.len()));
            Ok(())
        }
    }

    fn recorded() -> (CartStore, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let store = store().with_notifier(Arc::clone(&recorder));
        (store, recorder)
    }

    #[test]
    fn test_add_inserts_row() {
        let store = store();
        let row = store
            .add("sku-1", "T-shirt", 2, 5.0, attrs(json!({"color": "red"})))
            .unwrap();

        assert_eq!(row.id().as_str(), "sku-1");
        assert_eq!(row.name(), "T-shirt");
        assert_eq!(row.qty(), 2);
        assert_eq!(row.total(), 10.0);
        assert_eq!(row.attribute("color"), Some(&json!("red")));
        assert_eq!(store.get(row.raw_id()).unwrap(), Some(row));
    }

    #[test]
    fn test_same_configuration_merges() {
        let store = store();
        let first = store
            .add("sku-1", "T-shirt", 2, 5.0, attrs(json!({"color": "red"})))
            .unwrap();
        let second = store
            .add("sku-1", "T-shirt", 3, 5.0, attrs(json!({"color": "red"})))
            .unwrap();

        assert_eq!(first.raw_id(), second.raw_id());
        assert_eq!(store.count_rows().unwrap(), 1);
        assert_eq!(second.qty(), 5);
        assert_eq!(second.total(), 25.0);
    }

    #[test]
    fn test_attribute_order_does_not_split_rows() {
        let store = store();
        let mut forward = Attributes::new();
        forward.insert("size".into(), json!("M"));
        forward.insert("color".into(), json!("red"));
        let reverse = attrs(json!({"color": "red", "size": "M"}));

        store.add("sku-1", "T-shirt", 1, 5.0, forward).unwrap();
        store.add("sku-1", "T-shirt", 1, 5.0, reverse).unwrap();

        assert_eq!(store.count_rows().unwrap(), 1);
        assert_eq!(store.count(true).unwrap(), 2);
    }

    #[test]
    fn test_different_attributes_are_distinct_rows() {
        let store = store();
        let red = store
            .add("sku-1", "T-shirt", 1, 5.0, attrs(json!({"color": "red"})))
            .unwrap();
        let blue = store
            .add("sku-1", "T-shirt", 1, 5.0, attrs(json!({"color": "blue"})))
            .unwrap();

        assert_ne!(red.raw_id(), blue.raw_id());
        assert_eq!(store.count_rows().unwrap(), 2);
    }

    #[test]
    fn test_all_keeps_insertion_order() {
        let store = store();
        let a = store.add("b-product", "B", 1, 1.0, Attributes::new()).unwrap();
        let b = store.add("a-product", "A", 1, 1.0, Attributes::new()).unwrap();
        let c = store.add("c-product", "C", 1, 1.0, Attributes::new()).unwrap();

        let keys: Vec<RawId> = store.all().unwrap().keys().cloned().collect();
        assert_eq!(keys, [a.raw_id().clone(), b.raw_id().clone(), c.raw_id().clone()]);
    }

    #[test]
    fn test_add_validation() {
        let store = store();

        assert!(matches!(
            store.add("sku-1", "T-shirt", 0, 5.0, Attributes::new()),
            Err(CartError::InvalidQuantity(0))
        ));
        assert!(matches!(
            store.add("sku-1", "T-shirt", -3, 5.0, Attributes::new()),
            Err(CartError::InvalidQuantity(-3))
        ));
        assert!(matches!(
            store.add("sku-1", "T-shirt", 1, -1.0, Attributes::new()),
            Err(CartError::InvalidPrice(_))
        ));
        assert!(matches!(
            store.add("sku-1", "T-shirt", 1, f64::NAN, Attributes::new()),
            Err(CartError::InvalidPrice(_))
        ));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_add_rejects_unbounded_total() {
        let store = store();

        assert!(matches!(
            store.add("sku-big", "Yacht", 2, f64::MAX, Attributes::new()),
            Err(CartError::InvalidPrice(_))
        ));
        assert!(store.all().unwrap().is_empty());

        let row = store.add("sku-big", "Yacht", 1, f64::MAX, Attributes::new()).unwrap();
        assert!(matches!(
            store.add("sku-big", "Yacht", 1, f64::MAX, Attributes::new()),
            Err(CartError::InvalidQuantity(1))
        ));

        assert_eq!(store.get(row.raw_id()).unwrap(), Some(row));
        store.destroy().unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_update_rejects_unbounded_total() {
        let store = store();
        let row = store.add("sku-1", "T-shirt", 2, 5.0, Attributes::new()).unwrap();

        assert!(matches!(
            store.update_fields(row.raw_id(), criteria(json!({"price": f64::MAX}))),
            Err(CartError::InvalidPrice(_))
        ));
        let bulk = store.update_quantity(row.raw_id(), i64::MAX).unwrap();
        assert_eq!(bulk.total(), i64::MAX as f64 * 5.0);

        let pricey = store.add("sku-2", "Watch", 1, f64::MAX, Attributes::new()).unwrap();
        assert!(matches!(
            store.update_quantity(pricey.raw_id(), 3),
            Err(CartError::InvalidQuantity(3))
        ));
        assert_eq!(store.get(pricey.raw_id()).unwrap(), Some(pricey));
        assert_eq!(store.count_rows().unwrap(), 2);
    }

    #[test]
    fn test_count_saturates_across_rows() {
        let store = store();
        store
            .add("sku-1", "Bolt", i64::MAX, 0.0, attrs(json!({"size": "M4"})))
            .unwrap();
        store
            .add("sku-1", "Bolt", 1, 0.0, attrs(json!({"size": "M5"})))
            .unwrap();

        assert_eq!(store.count(true).unwrap(), i64::MAX);
        assert_eq!(store.count_rows().unwrap(), 2);
        assert!(!store.is_empty().unwrap());
    }

    #[test]
    fn test_field_update_keeps_raw_id() {
        let store = store();
        let red = store
            .add("sku-1", "T-shirt", 1, 5.0, attrs(json!({"color": "red"})))
            .unwrap();

        let repainted = store
            .update_fields(red.raw_id(), criteria(json!({"color": "blue"})))
            .unwrap();
        assert_eq!(repainted.raw_id(), red.raw_id());

        let blue = store
            .add("sku-1", "T-shirt", 1, 5.0, attrs(json!({"color": "blue"})))
            .unwrap();
        assert_ne!(blue.raw_id(), red.raw_id());
        assert_eq!(store.count_rows().unwrap(), 2);
    }

    #[test]
    fn test_free_items_are_allowed() {
        let store = store();
        let row = store.add("gift", "Sticker", 3, 0.0, Attributes::new()).unwrap();
        assert_eq!(row.total(), 0.0);
        assert!(!store.is_empty().unwrap());
    }

    #[test]
    fn test_totals_follow_every_mutation() {
        let store = store();
        let shirt = store
            .add("sku-1", "T-shirt", 2, 5.0, attrs(json!({"color": "red"})))
            .unwrap();
        let mug = store.add("sku-2", "Mug", 1, 12.5, Attributes::new()).unwrap();

        store.update(shirt.raw_id(), 4).unwrap();
        store
            .update_fields(mug.raw_id(), criteria(json!({"price": 10, "qty": 3})))
            .unwrap();

        let cart = store.all().unwrap();
        for row in &cart {
            assert_eq!(row.total(), row.qty() as f64 * row.price());
        }
        assert_eq!(store.total_price().unwrap(), 4.0 * 5.0 + 3.0 * 10.0);
        assert_eq!(store.total().unwrap(), store.total_price().unwrap());
    }

    #[test]
    fn test_count_semantics() {
        let store = store();
        store.add("a", "A", 2, 1.0, Attributes::new()).unwrap();
        store.add("b", "B", 3, 1.0, Attributes::new()).unwrap();

        assert_eq!(store.count(true).unwrap(), 5);
        assert_eq!(store.count(false).unwrap(), 2);
        assert_eq!(store.count_rows().unwrap(), 2);
    }

    #[test]
    fn test_update_to_zero_removes_row() {
        let store = store();
        let row = store.add("sku-1", "T-shirt", 2, 5.0, Attributes::new()).unwrap();

        let returned = store.update_quantity(row.raw_id(), 0).unwrap();

        assert_eq!(returned, row);
        assert_eq!(store.get(row.raw_id()).unwrap(), None);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_update_fields_with_negative_qty_removes_row() {
        let store = store();
        let row = store.add("sku-1", "T-shirt", 2, 5.0, Attributes::new()).unwrap();

        store
            .update_fields(row.raw_id(), criteria(json!({"qty": -1, "name": "ignored"})))
            .unwrap();

        assert_eq!(store.get(row.raw_id()).unwrap(), None);
    }

    #[test]
    fn test_update_fields() {
        let store = store();
        let row = store
            .add("sku-1", "T-shirt", 2, 5.0, attrs(json!({"color": "red"})))
            .unwrap();

        let updated = store
            .update_fields(
                row.raw_id(),
                criteria(json!({
                    "name": "Long-sleeve T-shirt",
                    "price": 7.5,
                    "gift_wrap": true,
                    "raw_id": "spoofed",
                    "total": 1,
                })),
            )
            .unwrap();

        assert_eq!(updated.raw_id(), row.raw_id());
        assert_eq!(updated.name(), "Long-sleeve T-shirt");
        assert_eq!(updated.price(), 7.5);
        assert_eq!(updated.total(), 15.0);
        assert_eq!(updated.attribute("gift_wrap"), Some(&json!(true)));
        assert_eq!(updated.attribute("color"), Some(&json!("red")));
        assert_eq!(store.get(row.raw_id()).unwrap(), Some(updated));
    }

    #[test]
    fn test_update_rejects_bad_fields_without_changes() {
        let store = store();
        let row = store.add("sku-1", "T-shirt", 2, 5.0, Attributes::new()).unwrap();

        assert!(matches!(
            store.update_fields(row.raw_id(), criteria(json!({"qty": "lots"}))),
            Err(CartError::InvalidField { .. })
        ));
        assert!(matches!(
            store.update_fields(row.raw_id(), criteria(json!({"name": "Hoodie", "price": -2}))),
            Err(CartError::InvalidPrice(_))
        ));
        assert_eq!(store.get(row.raw_id()).unwrap(), Some(row));
    }

    #[test]
    fn test_update_unknown_row() {
        let store = store();
        assert!(matches!(
            store.update(&RawId::new("missing"), 3),
            Err(CartError::ItemNotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = store();
        let row = store.add("sku-1", "T-shirt", 1, 5.0, Attributes::new()).unwrap();
        let before = store.all().unwrap();

        assert!(store.remove(&RawId::new("unknown")).unwrap());
        assert_eq!(store.all().unwrap(), before);

        assert!(store.remove(row.raw_id()).unwrap());
        assert!(store.remove(row.raw_id()).unwrap());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_destroy_and_clean() {
        let store = store();
        store.add("a", "A", 2, 3.0, Attributes::new()).unwrap();
        store.add("b", "B", 1, 4.0, Attributes::new()).unwrap();

        store.destroy().unwrap();
        assert_eq!(store.total_price().unwrap(), 0.0);
        assert!(store.is_empty().unwrap());
        assert_eq!(store.count_rows().unwrap(), 0);

        store.add("a", "A", 1, 3.0, Attributes::new()).unwrap();
        store.clean().unwrap();
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn test_search() {
        let store = store();
        let red_shirt = store
            .add("shirt", "T-shirt", 1, 5.0, attrs(json!({"color": "red"})))
            .unwrap();
        store
            .add("shirt", "T-shirt", 1, 5.0, attrs(json!({"color": "blue"})))
            .unwrap();
        let red_mug = store
            .add("mug", "Mug", 1, 8.0, attrs(json!({"color": "red"})))
            .unwrap();

        let red = store.search(&criteria(json!({"color": "red"}))).unwrap();
        let keys: Vec<&RawId> = red.keys().collect();
        assert_eq!(keys, [red_shirt.raw_id(), red_mug.raw_id()]);

        let red_mugs = store
            .search(&criteria(json!({"color": "red", "name": "Mug"})))
            .unwrap();
        assert_eq!(red_mugs.len(), 1);

        assert!(store.search(&Map::new()).unwrap().is_empty());
        assert!(store
            .search(&criteria(json!({"color": "green"})))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_add_events_carry_cart_before_mutation() {
        let (store, recorder) = recorded();
        store.add("a", "A", 1, 1.0, Attributes::new()).unwrap();
        store.add("b", "B", 1, 1.0, Attributes::new()).unwrap();

        assert_eq!(
            *recorder.events.lock().unwrap(),
            [
                ("cart.adding", 0),
                ("cart.added", 0),
                ("cart.adding", 1),
                ("cart.added", 1),
            ]
        );
    }

    #[test]
    fn test_update_remove_destroy_events() {
        let (store, recorder) = recorded();
        let a = store.add("a", "A", 1, 1.0, Attributes::new()).unwrap();
        let b = store.add("b", "B", 1, 1.0, Attributes::new()).unwrap();
        recorder.events.lock().unwrap().clear();

        store.update(a.raw_id(), 2).unwrap();
        store.update(a.raw_id(), 0).unwrap();
        store.remove(b.raw_id()).unwrap();
        store.remove(b.raw_id()).unwrap();
        store.destroy().unwrap();

        assert_eq!(
            *recorder.events.lock().unwrap(),
            [
                ("cart.updating", 2),
                ("cart.updated", 2),
                ("cart.updating", 2),
                ("cart.removing", 2),
                ("cart.removed", 1),
                ("cart.updated", 1),
                ("cart.removing", 1),
                ("cart.removed", 0),
                ("cart.destroying", 0),
                ("cart.destroyed", 0),
            ]
        );
    }

    #[test]
    fn test_notifier_failure_aborts_before_write() {
        let store = store().with_notifier(FnNotifier(|event: CartEvent, _: &EventPayload<'_>| {
            if event == CartEvent::Added {
                return Err(CartError::Notifier("listener refused".into()));
            }
            Ok(())
        }));

        assert!(matches!(
            store.add("a", "A", 1, 1.0, Attributes::new()),
            Err(CartError::Notifier(_))
        ));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_named_carts_are_isolated() {
        let cache = Cache::in_memory();
        let mut cart = CartStore::new(SessionStorage::new(session(&cache)));
        let wishlist = CartStore::new(SessionStorage::new(session(&cache))).with_name("wishlist");

        assert_eq!(cart.name(), DEFAULT_CART_KEY);
        assert_eq!(wishlist.name(), "cart.wishlist");

        wishlist.add("a", "A", 1, 1.0, Attributes::new()).unwrap();
        assert!(cart.is_empty().unwrap());

        cart.set_name("wishlist");
        assert_eq!(cart.count_rows().unwrap(), 1);
    }

    #[test]
    fn test_cart_survives_new_store() {
        let cache = Cache::in_memory();
        let row = CartStore::new(SessionStorage::new(session(&cache)))
            .add("a", "A", 2, 1.5, Attributes::new())
            .unwrap();

        let reopened = CartStore::new(SessionStorage::new(session(&cache)));
        assert_eq!(reopened.get(row.raw_id()).unwrap(), Some(row));
    }

    #[test]
    fn test_non_mapping_session_value_is_empty_cart() {
        let cache = Cache::in_memory();
        session(&cache)
            .put(DEFAULT_CART_KEY, json!("not a cart"))
            .unwrap();

        let store = CartStore::new(SessionStorage::new(session(&cache)));
        assert!(store.is_empty().unwrap());

        store.add("a", "A", 1, 1.0, Attributes::new()).unwrap();
        assert_eq!(store.count_rows().unwrap(), 1);
    }

    #[test]
    fn test_associate_model() {
        let models = ModelRegistry::new().with("shop::models::Product", |id: &ProductId| {
            Some(json!({ "sku": id.as_str(), "title": "Rust Mug" }))
        });
        let mut store = store().with_models(models);

        assert!(matches!(
            store.associate_model("shop::models::Missing"),
            Err(CartError::InvalidModel(_))
        ));
        assert_eq!(store.model(), None);

        store.associate_model("shop::models::Product").unwrap();
        assert_eq!(store.model(), Some("shop::models::Product"));

        let row = store.add("mug-1", "Mug", 1, 8.0, Attributes::new()).unwrap();
        assert_eq!(row.model(), Some("shop::models::Product"));
        assert_eq!(
            store.linked_model(&row, "product"),
            Some(json!({ "sku": "mug-1", "title": "Rust Mug" }))
        );
        assert_eq!(store.linked_model(&row, "category"), None);
    }

    #[test]
    fn test_from_config_session_with_name() {
        let cache = Cache::in_memory();
        let config = CartConfig::default().with_name("saved");
        let store = CartStore::from_config(&config, session(&cache)).unwrap();

        assert_eq!(store.name(), "cart.saved");
        store.add("a", "A", 1, 1.0, Attributes::new()).unwrap();
        assert!(session(&cache).has("cart.saved").unwrap());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_from_config_database_outside_spin() {
        let config = CartConfig::default().with_storage(StorageKind::Database);
        let result = CartStore::from_config(&config, session(&Cache::in_memory()));
        assert!(matches!(result, Err(CartError::Storage(_))));
    }
}

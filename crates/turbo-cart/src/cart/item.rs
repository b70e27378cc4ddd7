//! Line item value type.

use crate::ids::{ProductId, RawId};
use crate::model::ModelRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Extra attributes of a line item. They take part in the row identity.
pub type Attributes = BTreeMap<String, Value>;

/// One distinct purchasable configuration in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    raw_id: RawId,
    id: ProductId,
    name: String,
    qty: i64,
    price: f64,
    total: f64,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

impl LineItem {
    pub(crate) fn new(
        raw_id: RawId,
        id: ProductId,
        name: String,
        qty: i64,
        price: f64,
        attributes: Attributes,
        model: Option<String>,
    ) -> Self {
        Self {
            raw_id,
            id,
            name,
            qty,
            price,
            total: line_total(qty, price),
            attributes,
            model,
        }
    }

    /// Fingerprint keying this row.
    pub fn raw_id(&self) -> &RawId {
        &self.raw_id
    }

    /// External product ID.
    pub fn id(&self) -> &ProductId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qty(&self) -> i64 {
        self.qty
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// `qty * price`, kept in sync by every mutation.
    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Single attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Model type name associated when the row was created.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Look up a field by name.
    ///
    /// Known fields (`raw_id`, `id`, `name`, `qty`, `price`, `total`, `model`)
    /// take precedence over attributes with the same key.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "raw_id" => Some(Value::String(self.raw_id.to_string())),
            "id" => Some(Value::String(self.id.to_string())),
            "name" => Some(Value::String(self.name.clone())),
            "qty" => Some(Value::from(self.qty)),
            "price" => Some(Value::from(self.price)),
            "total" => Some(Value::from(self.total)),
            "model" => self.model.clone().map(Value::String),
            _ => self.attributes.get(name).cloned(),
        }
    }

    /// Whether every criterion names a field holding an equal value.
    ///
    /// Numbers compare by value, so `5` matches a price of `5.0`. Criteria
    /// go through [`field`](Self::field), so an attribute named like a known
    /// field (`name`, `qty`, `price`, ...) can never be matched.
    pub fn matches(&self, criteria: &Map<String, Value>) -> bool {
        criteria.iter().all(|(key, expected)| {
            self.field(key)
                .is_some_and(|actual| values_match(&actual, expected))
        })
    }

    /// Resolve the associated model for this row's product ID.
    ///
    /// `property` must equal the lowercase last path segment of the model
    /// name (`"product"` for `"shop::models::Product"`). Returns `None` when
    /// no model is associated, the name does not match, or the registry has
    /// no record for the ID.
    pub fn resolve_linked_model(&self, registry: &ModelRegistry, property: &str) -> Option<Value> {
        let model = self.model.as_deref()?;
        if model_property(model) != property {
            return None;
        }
        registry.resolver(model)?.find(&self.id)
    }

    pub(crate) fn set_qty(&mut self, qty: i64) {
        self.qty = qty;
        self.recompute_total();
    }

    pub(crate) fn set_price(&mut self, price: f64) {
        self.price = price;
        self.recompute_total();
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_id(&mut self, id: ProductId) {
        self.id = id;
    }

    pub(crate) fn set_attribute(&mut self, key: String, value: Value) {
        self.attributes.insert(key, value);
    }

    fn recompute_total(&mut self) {
        self.total = line_total(self.qty, self.price);
    }
}

fn line_total(qty: i64, price: f64) -> f64 {
    qty as f64 * price
}

/// Lowercase last segment of a model type name.
fn model_property(model: &str) -> String {
    model
        .rsplit(|c: char| c == ':' || c == '\\')
        .next()
        .unwrap_or(model)
        .to_lowercase()
}

fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

//! Insertion-ordered collection of cart rows.

use crate::cart::LineItem;
use crate::error::CartError;
use crate::ids::RawId;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Cart contents: rows keyed by raw ID, in insertion order.
///
/// Serializes as a JSON object `{ raw_id: line_item, ... }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stored value. Anything other than an object is an empty cart.
    pub fn from_stored(value: Option<Value>) -> Result<Self, CartError> {
        match value {
            Some(value @ Value::Object(_)) => Ok(serde_json::from_value(value)?),
            None | Some(Value::Null) => Ok(Self::new()),
            Some(other) => {
                tracing::warn!(kind = value_kind(&other), "stored cart is not a mapping, using empty cart");
                Ok(Self::new())
            }
        }
    }

    /// Encode for storage.
    pub fn to_stored(&self) -> Result<Value, CartError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Get a row by raw ID.
    pub fn get(&self, raw_id: &RawId) -> Option<&LineItem> {
        self.items.iter().find(|i| i.raw_id() == raw_id)
    }

    pub(crate) fn get_mut(&mut self, raw_id: &RawId) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|i| i.raw_id() == raw_id)
    }

    pub fn contains(&self, raw_id: &RawId) -> bool {
        self.get(raw_id).is_some()
    }

    /// Insert a row, replacing an existing row with the same raw ID in place.
    pub(crate) fn put(&mut self, item: LineItem) {
        match self.get_mut(item.raw_id()) {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
    }

    pub(crate) fn forget(&mut self, raw_id: &RawId) -> Option<LineItem> {
        let index = self.items.iter().position(|i| i.raw_id() == raw_id)?;
        Some(self.items.remove(index))
    }

    /// Number of distinct rows.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    /// Raw IDs in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &RawId> {
        self.items.iter().map(LineItem::raw_id)
    }

    /// Sum of all row quantities, saturating at `i64::MAX`.
    pub fn quantity(&self) -> i64 {
        self.items
            .iter()
            .map(LineItem::qty)
            .fold(0, i64::saturating_add)
    }

    /// Sum of `qty * price` over all rows.
    pub fn total_price(&self) -> f64 {
        self.items
            .iter()
            .map(|i| i.qty() as f64 * i.price())
            .sum()
    }

    /// Rows matching every criterion. Empty criteria match nothing.
    pub fn search(&self, criteria: &Map<String, Value>) -> Cart {
        if criteria.is_empty() {
            return Cart::new();
        }
        self.items
            .iter()
            .filter(|item| item.matches(criteria))
            .cloned()
            .collect()
    }
}

impl FromIterator<LineItem> for Cart {
    fn from_iter<I: IntoIterator<Item = LineItem>>(iter: I) -> Self {
        let mut cart = Cart::new();
        for item in iter {
            cart.put(item);
        }
        cart
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for Cart {
    type Item = LineItem;
    type IntoIter = std::vec::IntoIter<LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl Serialize for Cart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.items.len()))?;
        for item in &self.items {
            map.serialize_entry(item.raw_id(), item)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Cart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Map::<String, Value>::deserialize(deserializer)?;
        entries
            .into_iter()
            .map(|(_, row)| serde_json::from_value::<LineItem>(row).map_err(D::Error::custom))
            .collect()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//! Row identity: the raw ID of a cart row is a digest of the product ID and
//! its attribute set.

use crate::cart::Attributes;
use crate::ids::{ProductId, RawId};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute the raw ID for a product ID and attribute set.
///
/// Attributes are hashed in key order and nested objects are canonicalized,
/// so equal attribute sets always produce the same raw ID no matter how they
/// were built. Every component is length-prefixed.
pub fn fingerprint(id: &ProductId, attributes: &Attributes) -> RawId {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, id.as_str());
    hasher.update((attributes.len() as u64).to_le_bytes());

    for (key, value) in attributes {
        update_field(&mut hasher, key);
        update_field(&mut hasher, &canonical_json(value));
    }

    RawId::new(hex::encode(hasher.finalize()))
}

fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

/// Serialize a JSON value with object keys sorted at every depth.
fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let body: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        Value::Array(items) => {
            let body: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", body.join(","))
        }
        other => other.to_string(),
    }
}

//! Load-time merge of a persisted settings blob into the live tree.

use serde_json::Value;

/// Merges `incoming` into `base` in place.
///
/// Mappings merge key by key: keys only in `base` survive, keys in both
/// recurse, keys only in `incoming` are added. Every other value, including
/// sequences, is replaced wholesale by the incoming one.
pub fn merge_into(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match existing.get_mut(&key) {
                    Some(slot) => merge_into(slot, value),
                    None => {
                        existing.insert(key, value);
                    }
                }
            }
        }
        (slot, incoming) => *slot = incoming,
    }
}

pub fn merge_tree(base: &Value, incoming: Value) -> Value {
    let mut merged = base.clone();
    merge_into(&mut merged, incoming);
    merged
}

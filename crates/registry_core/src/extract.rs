use serde_json::Value;

use crate::EntityKind;

/// Generic wrapper keys, checked before any resource-specific key.
pub const WRAPPER_KEYS: [&str; 3] = ["items", "data", "result"];

/// Best-effort lookup of the record array inside a decoded list payload.
///
/// Bare arrays are returned as-is. Objects are searched for an array under
/// [`WRAPPER_KEYS`] and then the resource-specific keys of `kind`; an object
/// that itself carries an identifier is treated as a single record. Anything
/// else yields an empty list.
pub fn extract_list(payload: &Value, kind: EntityKind) -> Vec<Value> {
    let object = match payload {
        Value::Array(items) => return items.clone(),
        Value::Object(object) => object,
        _ => return Vec::new(),
    };

    let specific = kind.list_keys();
    let keys = WRAPPER_KEYS
        .iter()
        .copied()
        .chain(specific.iter().map(String::as_str));
    for key in keys {
        if let Some(Value::Array(items)) = object.get(key) {
            return items.clone();
        }
    }

    if kind.alias_table().resolve_id(payload).is_some() {
        return vec![payload.clone()];
    }
    Vec::new()
}

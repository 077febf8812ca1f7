//! Safe navigation through loosely structured JSON.
//!
//! Missing keys, out-of-range indices and type mismatches all resolve to
//! `null`, so callers read whatever exists without checking each level.

use serde_json::Value;

static NULL: Value = Value::Null;

/// Follow `path` from `value`. Segments index objects by key and arrays by
/// position.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> &'a Value {
    path.iter().fold(value, |current, segment| match current {
        Value::Object(map) => map.get(*segment).unwrap_or(&NULL),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index))
            .unwrap_or(&NULL),
        _ => &NULL,
    })
}

/// Array items, or nothing when `value` is not an array.
pub fn items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or_default()
}

/// Dotted rendering of a path for diagnostics.
pub fn display_path(path: &[&str]) -> String {
    path.join(".")
}

//! Untyped deep merge over raw `serde_json::Value` patch fragments.
//!
//! Raw object-patch overrides have no typed schema, so the zero-value
//! contract degenerates to "null = unset": a null overlay leaves the original
//! untouched, and everything else counts as set.
//!
//! The policy mirrors the typed engine:
//!
//! - Objects merge recursively key-wise; keys only in the overlay are added.
//! - Arrays concatenate (original entries followed by overlay entries).
//! - Scalars are replaced by the overlay.
//! - Structural mismatches (e.g. object vs scalar at the same key) are
//!   resolved by letting the overlay replace. This is documented policy, not
//!   a failure; a warning is logged because it usually indicates a typo in a
//!   patch fragment.

use log::{debug, warn};
use serde_json::Value as JsonValue;

/// Recursively merge an overlay fragment into a target value.
///
/// `path` is the dotted location within the object tree, used only for
/// logging.
pub fn merge_values(target: &mut JsonValue, overlay: &JsonValue, path: &str) {
    if overlay.is_null() {
        return;
    }
    if target.is_null() {
        *target = overlay.clone();
        return;
    }

    match (&mut *target, overlay) {
        (JsonValue::Object(target_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                match target_map.get_mut(key) {
                    Some(existing) => merge_values(existing, overlay_value, &child_path),
                    None => {
                        target_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (JsonValue::Array(target_seq), JsonValue::Array(overlay_seq)) => {
            target_seq.extend(overlay_seq.iter().cloned());
        }
        (existing, overlay_value) => {
            if value_type_name(existing) != value_type_name(overlay_value) {
                warn!(
                    "Type mismatch at path '{}': replacing {} with {}",
                    path,
                    value_type_name(existing),
                    value_type_name(overlay_value)
                );
            } else {
                debug!("Overwriting value at path '{}'", path);
            }
            *existing = overlay_value.clone();
        }
    }
}

/// Merge two fragments into a new value, leaving both inputs untouched.
///
/// A null overlay returns the original unchanged; a null original returns the
/// overlay.
pub fn merged(original: &JsonValue, overlay: &JsonValue) -> JsonValue {
    let mut result = original.clone();
    merge_values(&mut result, overlay, "");
    result
}

/// Get a human-readable type name for a JSON value, for logging.
pub fn value_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "Null",
        JsonValue::Bool(_) => "Bool",
        JsonValue::Number(_) => "Number",
        JsonValue::String(_) => "String",
        JsonValue::Array(_) => "Array",
        JsonValue::Object(_) => "Object",
    }
}

//! Structural patch computation between live and desired objects.
//!
//! The diff walks the desired object's keys only: a field the builder did not
//! declare is never diffed, so externally-assigned fields survive
//! convergence untouched. Objects recurse key-wise; sequences compare
//! wholesale; null desired values count as "not declared" and are skipped.
//!
//! The status sub-resource and store-assigned metadata are stripped before
//! diffing: they are maintained externally and must never trigger an
//! update.

use serde_json::{Map, Value as JsonValue};

/// Remove the parts of an object view that never participate in diffing:
/// the status sub-resource and store-assigned metadata fields.
pub fn strip_non_comparable(view: &mut JsonValue) {
    if let Some(map) = view.as_object_mut() {
        map.remove("status");
        if let Some(metadata) = map.get_mut("metadata").and_then(JsonValue::as_object_mut) {
            metadata.remove("uid");
            metadata.remove("resourceVersion");
        }
    }
}

/// Compute the structural patch: the subset of `desired` that differs from
/// `live`. Returns a JSON object; an empty object means no change.
pub fn diff_value(live: &JsonValue, desired: &JsonValue) -> JsonValue {
    match (live, desired) {
        (JsonValue::Object(live_map), JsonValue::Object(desired_map)) => {
            JsonValue::Object(diff_objects(live_map, desired_map))
        }
        _ => {
            if live == desired || desired.is_null() {
                JsonValue::Object(Map::new())
            } else {
                desired.clone()
            }
        }
    }
}

fn diff_objects(live: &Map<String, JsonValue>, desired: &Map<String, JsonValue>) -> Map<String, JsonValue> {
    let mut patch = Map::new();
    for (key, desired_value) in desired {
        // Null means "not declared": never diffed, never cleared.
        if desired_value.is_null() {
            continue;
        }
        match live.get(key) {
            None => {
                patch.insert(key.clone(), desired_value.clone());
            }
            Some(live_value) => match (live_value, desired_value) {
                (JsonValue::Object(live_child), JsonValue::Object(desired_child)) => {
                    let child_patch = diff_objects(live_child, desired_child);
                    if !child_patch.is_empty() {
                        patch.insert(key.clone(), JsonValue::Object(child_patch));
                    }
                }
                _ => {
                    if live_value != desired_value {
                        patch.insert(key.clone(), desired_value.clone());
                    }
                }
            },
        }
    }
    patch
}

/// Whether a computed patch carries any change.
pub fn patch_is_empty(patch: &JsonValue) -> bool {
    match patch {
        JsonValue::Object(map) => map.is_empty(),
        JsonValue::Null => true,
        _ => false,
    }
}

/// Apply a patch onto a base value: objects recurse, everything else is
/// replaced by the patch entry.
///
/// Unlike the override merge, sequences replace rather than concatenate: a
/// patch entry is the exact desired value for that field.
pub fn apply_patch(base: &mut JsonValue, patch: &JsonValue) {
    match (&mut *base, patch) {
        (JsonValue::Object(base_map), JsonValue::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.get_mut(key) {
                    Some(existing) if existing.is_object() && patch_value.is_object() => {
                        apply_patch(existing, patch_value);
                    }
                    _ => {
                        base_map.insert(key.clone(), patch_value.clone());
                    }
                }
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value.clone();
        }
    }
}

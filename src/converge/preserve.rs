//! Type-specific live-state preservation applied before diffing.
//!
//! Some kinds carry fields the platform assigns after creation. Diffing those
//! against a desired object that (correctly) omits them would produce an
//! endless update loop, or worse, clear the assignment. This module copies
//! such live state into the desired object, or excludes it from comparison,
//! per kind:
//!
//! - **Network endpoints (`Service`)**: the live cluster-assigned virtual
//!   address and any live per-port allocations are copied into the desired
//!   object so they are never diffed away.
//! - **Replicated-storage workloads (`StatefulSet`)**: volume-claim-template
//!   metadata (everything but the claim name) is defaulted by the platform
//!   and excluded from comparison on both sides. Status is already excluded
//!   generically.
//!
//! Kinds without special handling pass through unchanged.

use serde_json::Value as JsonValue;

use crate::object::Object;

/// Copy live-assigned state into the desired object, dispatched on kind.
pub fn preserve_live_state(kind: &str, live: &Object, desired: &mut Object) {
    match kind {
        "Service" => preserve_endpoint_allocations(live, desired),
        _ => {}
    }
}

/// Normalize an object view for diffing, dispatched on kind. Applied to both
/// the live and the desired view.
pub fn normalize_for_diff(kind: &str, view: &mut JsonValue) {
    match kind {
        "StatefulSet" => strip_volume_claim_metadata(view),
        _ => {}
    }
}

/// Copy the live virtual address and per-port allocations into `desired`.
fn preserve_endpoint_allocations(live: &Object, desired: &mut Object) {
    for field in ["clusterIP", "clusterIPs"] {
        let assigned = live.spec.get(field).cloned();
        if let Some(assigned) = assigned {
            if !assigned.is_null() && field_is_unset(desired.spec.get(field)) {
                set_spec_field(desired, field, assigned);
            }
        }
    }

    let live_ports = match live.spec.get("ports").and_then(JsonValue::as_array) {
        Some(ports) => ports.clone(),
        None => return,
    };
    let desired_ports = match desired
        .spec
        .get_mut("ports")
        .and_then(JsonValue::as_array_mut)
    {
        Some(ports) => ports,
        None => return,
    };

    for (index, desired_port) in desired_ports.iter_mut().enumerate() {
        let live_port = match_port(&live_ports, desired_port, index);
        if let Some(live_port) = live_port {
            let allocated = live_port.get("nodePort").cloned();
            if let Some(allocated) = allocated {
                if !allocated.is_null() && field_is_unset(desired_port.get("nodePort")) {
                    if let Some(port_map) = desired_port.as_object_mut() {
                        port_map.insert("nodePort".to_string(), allocated);
                    }
                }
            }
        }
    }
}

/// Find the live port matching a desired port: by name when both sides name
/// their ports, by position otherwise.
fn match_port<'a>(
    live_ports: &'a [JsonValue],
    desired_port: &JsonValue,
    index: usize,
) -> Option<&'a JsonValue> {
    if let Some(name) = desired_port.get("name").and_then(JsonValue::as_str) {
        if let Some(found) = live_ports
            .iter()
            .find(|p| p.get("name").and_then(JsonValue::as_str) == Some(name))
        {
            return Some(found);
        }
    }
    live_ports.get(index)
}

/// Whether a spec field counts as unset: absent, null, or zero.
fn field_is_unset(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::Number(n)) => n.as_u64() == Some(0),
        Some(JsonValue::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn set_spec_field(object: &mut Object, field: &str, value: JsonValue) {
    if object.spec.is_null() {
        object.spec = JsonValue::Object(serde_json::Map::new());
    }
    if let Some(spec) = object.spec.as_object_mut() {
        spec.insert(field.to_string(), value);
    }
}

/// Drop everything but the claim name from volume-claim-template metadata.
fn strip_volume_claim_metadata(view: &mut JsonValue) {
    let templates = view
        .get_mut("spec")
        .and_then(|spec| spec.get_mut("volumeClaimTemplates"))
        .and_then(JsonValue::as_array_mut);
    let templates = match templates {
        Some(templates) => templates,
        None => return,
    };

    for template in templates {
        let metadata = template.get_mut("metadata").and_then(JsonValue::as_object_mut);
        if let Some(metadata) = metadata {
            let name = metadata.get("name").cloned();
            metadata.clear();
            if let Some(name) = name {
                metadata.insert("name".to_string(), name);
            }
        }
        if let Some(map) = template.as_object_mut() {
            map.remove("status");
        }
    }
}

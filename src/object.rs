//! # Managed Object Model
//!
//! This module defines the data structures that represent managed objects as
//! they travel between builders, the converge engine, and the external store.
//! Field-level schemas for concrete resource kinds are external collaborators;
//! internally an object is typed metadata plus an opaque `serde_json::Value`
//! payload, which is all the converge engine needs for structural comparison.
//!
//! ## Key Components
//!
//! - **`TypeMeta`**: the external type identity of an object (group, version,
//!   kind), resolved through the type registry.
//! - **`ObjectMeta`**: name, namespace, labels, annotations, owner references
//!   and the store-assigned identity fields (uid, resource version).
//! - **`Object`**: what a builder produces (desired) and what the store
//!   returns (live). Desired and live objects are the same shape and are
//!   compared structurally during convergence.
//! - **`ObjectRef`**: the `(group, version, kind, namespace, name)` key used
//!   for all store operations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;

/// Annotation key under which the converge engine records the last applied
/// desired state of an object, for later structural comparison.
pub const LAST_APPLIED_ANNOTATION: &str = "converge-kit.dev/last-applied-state";

/// External type identity of a managed object.
///
/// The core API group is represented by an empty `group` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeMeta {
    /// API group (empty for the core group)
    #[serde(default)]
    pub group: String,
    /// API version within the group (e.g. "v1")
    pub version: String,
    /// Object kind (e.g. "Service")
    pub kind: String,
}

impl TypeMeta {
    pub fn new(group: &str, version: &str, kind: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Render the combined apiVersion string: `group/version`, or just
    /// `version` for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

/// A reference linking a dependent object to the managed unit that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    /// Combined apiVersion of the owner
    pub api_version: String,
    /// Kind of the owner
    pub kind: String,
    /// Name of the owner
    pub name: String,
    /// Store-assigned unique identity of the owner
    pub uid: String,
    /// Whether this reference is the controlling one. At most one owner
    /// reference per object may have this set.
    #[serde(default)]
    pub controller: bool,
}

/// Object metadata: identity, labels, annotations, ownership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name, unique within its namespace and kind
    pub name: String,
    /// Namespace; `None` for cluster-scoped objects
    #[serde(default)]
    pub namespace: Option<String>,
    /// Store-assigned unique identity; absent until created
    #[serde(default)]
    pub uid: Option<String>,
    /// Optimistic-concurrency token; absent until created
    #[serde(default)]
    pub resource_version: Option<String>,
    /// Applied labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Owner references; at most one with `controller = true`
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    /// The controlling owner reference, if any.
    pub fn controller_owner(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.controller)
    }
}

/// A managed object: what a builder produces and what the store returns.
///
/// `kind` is the registry key under which the object's external type identity
/// is resolved. `spec` carries the kind-specific payload; `status` is the
/// externally-maintained status sub-resource, which is never diffed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// Registry kind key (e.g. "Service", "StatefulSet")
    pub kind: String,
    /// Object metadata
    pub metadata: ObjectMeta,
    /// Kind-specific payload
    #[serde(default)]
    pub spec: JsonValue,
    /// Status sub-resource, maintained externally; ignored during diffing
    #[serde(default)]
    pub status: JsonValue,
}

impl Object {
    /// Create a new object of the given kind and name with empty payload.
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            metadata: ObjectMeta {
                name: name.to_string(),
                ..ObjectMeta::default()
            },
            spec: JsonValue::Null,
            status: JsonValue::Null,
        }
    }

    /// The store key for this object under the given resolved type identity.
    pub fn reference(&self, types: &TypeMeta) -> ObjectRef {
        ObjectRef {
            types: types.clone(),
            namespace: self.metadata.namespace.clone(),
            name: self.metadata.name.clone(),
        }
    }

    /// The last applied desired state previously stamped onto this object,
    /// if any.
    pub fn last_applied(&self) -> Option<&str> {
        self.metadata
            .annotations
            .get(LAST_APPLIED_ANNOTATION)
            .map(String::as_str)
    }

    /// Stamp the last-applied-state annotation with a serialization of this
    /// object's desired state.
    ///
    /// Store-assigned fields (uid, resource version), the status sub-resource
    /// and any previous stamp are excluded, so the recorded state is exactly
    /// what the builder declared.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the desired state cannot be serialized.
    pub fn stamp_last_applied(&mut self) -> Result<()> {
        let mut applied = self.clone();
        applied.status = JsonValue::Null;
        applied.metadata.uid = None;
        applied.metadata.resource_version = None;
        applied.metadata.annotations.remove(LAST_APPLIED_ANNOTATION);

        let serialized = serde_json::to_string(&applied)?;
        self.metadata
            .annotations
            .insert(LAST_APPLIED_ANNOTATION.to_string(), serialized);
        Ok(())
    }
}

/// The key identifying one object in the external store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Resolved type identity
    pub types: TypeMeta,
    /// Namespace; `None` for cluster-scoped objects
    pub namespace: Option<String>,
    /// Object name
    pub name: String,
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(
                f,
                "{}/{} {}/{}",
                self.types.api_version(),
                self.types.kind,
                ns,
                self.name
            ),
            None => write!(
                f,
                "{}/{} {}",
                self.types.api_version(),
                self.types.kind,
                self.name
            ),
        }
    }
}

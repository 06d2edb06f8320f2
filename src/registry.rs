//! Type registry mapping object kinds to their external type identity.
//!
//! The external store addresses objects by `(group, version, kind)`; builders
//! only name a kind. The registry performs that resolution, and an unknown
//! kind is the fatal `Error::Lookup`: an object whose type identity cannot
//! be resolved can never be written, so the owning unit's pass is aborted.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::object::TypeMeta;

/// Whether objects of a kind live inside a namespace or at cluster scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Namespaced,
    Cluster,
}

/// Resolved type information for one registered kind.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// External type identity
    pub types: TypeMeta,
    /// Namespace scoping of the kind
    pub scope: Scope,
}

/// Registry of known object kinds.
///
/// The registry is populated once at controller start-up and then only read,
/// so lookups borrow.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    kinds: HashMap<String, TypeInfo>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the kinds the library itself
    /// special-cases: workload sets, run-to-completion jobs, network
    /// endpoints, configuration and credential artifacts, and disruption
    /// budgets.
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        registry.register(TypeMeta::new("apps", "v1", "StatefulSet"), Scope::Namespaced);
        registry.register(TypeMeta::new("apps", "v1", "Deployment"), Scope::Namespaced);
        registry.register(TypeMeta::new("batch", "v1", "Job"), Scope::Namespaced);
        registry.register(TypeMeta::new("", "v1", "Service"), Scope::Namespaced);
        registry.register(TypeMeta::new("", "v1", "ConfigMap"), Scope::Namespaced);
        registry.register(TypeMeta::new("", "v1", "Secret"), Scope::Namespaced);
        registry.register(TypeMeta::new("", "v1", "ServiceAccount"), Scope::Namespaced);
        registry.register(
            TypeMeta::new("policy", "v1", "PodDisruptionBudget"),
            Scope::Namespaced,
        );
        registry.register(TypeMeta::new("", "v1", "Namespace"), Scope::Cluster);
        registry
    }

    /// Register a kind under its `TypeMeta::kind` name, replacing any
    /// previous registration of the same kind.
    pub fn register(&mut self, types: TypeMeta, scope: Scope) {
        self.kinds
            .insert(types.kind.clone(), TypeInfo { types, scope });
    }

    /// Resolve a kind name to its type information.
    ///
    /// # Errors
    ///
    /// Returns `Error::Lookup` if the kind has never been registered.
    pub fn resolve(&self, kind: &str) -> Result<&TypeInfo> {
        self.kinds.get(kind).ok_or_else(|| Error::Lookup {
            kind: kind.to_string(),
        })
    }

    /// Whether a kind is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }
}

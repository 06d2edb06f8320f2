//! # Idempotent Converge Engine
//!
//! Given a desired object and the live state in the external store, the
//! engine decides create / patch / no-op, preserves externally-assigned
//! fields, and reports whether a visible mutation occurred (the signal the
//! orchestrator uses to decide on requeueing).
//!
//! ## State machine per managed object
//!
//! ```text
//! Absent            --create--> Present (mutated)
//! Present, no diff  ----------> Present (unmutated)
//! Present, diff     --patch---> Present (mutated)
//! ```
//!
//! Convergence is level-triggered: the full decision is re-evaluated on every
//! reconcile call, and no object-local state persists between calls beyond
//! what is stored externally (the last-applied annotation).
//!
//! ## Failure handling
//!
//! An unknown kind is the fatal [`Error::Lookup`]; a foreign controlling
//! owner is [`Error::Ownership`]; transient fetch errors propagate for the
//! external scheduler to retry. A failure *computing* the patch is recovered
//! locally: the engine falls back to an unconditional update carrying over
//! the live resource-version, so a diff bug can never block progress.

pub mod diff;
pub mod preserve;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef, OwnerReference, LAST_APPLIED_ANNOTATION};
use crate::registry::{Scope, TypeInfo, TypeRegistry};
use crate::store::ObjectStore;

/// The converge engine: one store handle plus the type registry.
///
/// Cheap to clone when the store handle is (the in-memory store is).
#[derive(Debug, Clone)]
pub struct Converger<S> {
    store: S,
    registry: TypeRegistry,
}

impl<S: ObjectStore> Converger<S> {
    pub fn new(store: S, registry: TypeRegistry) -> Self {
        Self { store, registry }
    }

    /// The underlying store handle.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The type registry used to resolve object kinds.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Converge one desired object against live state.
    ///
    /// Returns `true` when a visible mutation occurred (create or update),
    /// `false` when the live object already matched.
    ///
    /// # Errors
    ///
    /// `Error::Lookup` for an unknown kind, `Error::Ownership` when the
    /// owner reference cannot be attached, and any transient store error.
    pub fn apply(&self, owner: Option<&OwnerReference>, mut desired: Object) -> Result<bool> {
        let info = self.registry.resolve(&desired.kind)?.clone();
        let key = desired.reference(&info.types);
        attach_owner(&info, owner, &key, &mut desired)?;

        let live = match self.store.get(&key) {
            Ok(live) => live,
            Err(Error::NotFound { .. }) => {
                desired.stamp_last_applied()?;
                self.store.create(&key, desired)?;
                debug!("Created {}", key);
                return Ok(true);
            }
            Err(err) => return Err(err),
        };

        preserve::preserve_live_state(&info.types.kind, &live, &mut desired);

        match patched_update(&info, &live, &desired) {
            Ok(None) => {
                debug!("No changes for {}", key);
                Ok(false)
            }
            Ok(Some(mut updated)) => {
                desired.stamp_last_applied()?;
                if let Some(stamp) = desired.last_applied() {
                    updated
                        .metadata
                        .annotations
                        .insert(LAST_APPLIED_ANNOTATION.to_string(), stamp.to_string());
                }
                updated.metadata.resource_version = live.metadata.resource_version.clone();
                self.store.update(&key, updated)?;
                debug!("Patched {}", key);
                Ok(true)
            }
            Err(err) => {
                // Never block progress on a diff bug: push the desired state
                // as-is, carrying over the live resource-version.
                warn!(
                    "Patch computation failed for {} ({}); falling back to unconditional update",
                    key, err
                );
                let mut updated = desired;
                updated.metadata.uid = live.metadata.uid.clone();
                updated.metadata.resource_version = live.metadata.resource_version.clone();
                updated.stamp_last_applied()?;
                self.store.update(&key, updated)?;
                Ok(true)
            }
        }
    }

    /// Create the object if it does not exist; never touch it afterwards.
    ///
    /// Used for artifacts that must not be overwritten post-creation, such
    /// as generated credentials.
    ///
    /// Returns `true` only when the object was created on this call.
    pub fn create_if_absent(
        &self,
        owner: Option<&OwnerReference>,
        mut desired: Object,
    ) -> Result<bool> {
        let info = self.registry.resolve(&desired.kind)?.clone();
        let key = desired.reference(&info.types);
        attach_owner(&info, owner, &key, &mut desired)?;

        match self.store.get(&key) {
            Ok(_) => Ok(false),
            Err(Error::NotFound { .. }) => {
                desired.stamp_last_applied()?;
                self.store.create(&key, desired)?;
                debug!("Created {}", key);
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }
}

/// Attach the owning unit's reference to a desired object.
///
/// Skipped (not an error) when the kind has no namespace scope or no owner
/// identity was supplied. Re-attaching the same owner is a no-op; a different
/// controlling owner already present is `Error::Ownership`.
fn attach_owner(
    info: &TypeInfo,
    owner: Option<&OwnerReference>,
    key: &ObjectRef,
    desired: &mut Object,
) -> Result<()> {
    let owner = match owner {
        Some(owner) => owner,
        None => return Ok(()),
    };
    if info.scope == Scope::Cluster {
        return Ok(());
    }

    if desired
        .metadata
        .owner_references
        .iter()
        .any(|r| r.uid == owner.uid)
    {
        return Ok(());
    }
    if let Some(existing) = desired.metadata.controller_owner() {
        if existing.uid != owner.uid {
            return Err(Error::Ownership {
                object: key.to_string(),
                message: format!(
                    "already controlled by {} {}",
                    existing.kind, existing.name
                ),
            });
        }
    }

    desired.metadata.owner_references.push(owner.clone());
    Ok(())
}

/// Compute the patched update object, or `None` when live already matches.
///
/// Any failure in here is a diff bug by definition; the caller recovers with
/// an unconditional update.
fn patched_update(info: &TypeInfo, live: &Object, desired: &Object) -> Result<Option<Object>> {
    let mut live_view = serde_json::to_value(live).map_err(|err| Error::Diff {
        message: err.to_string(),
    })?;
    let mut desired_view = serde_json::to_value(desired).map_err(|err| Error::Diff {
        message: err.to_string(),
    })?;

    diff::strip_non_comparable(&mut live_view);
    diff::strip_non_comparable(&mut desired_view);
    preserve::normalize_for_diff(&info.types.kind, &mut live_view);
    preserve::normalize_for_diff(&info.types.kind, &mut desired_view);

    let patch = diff::diff_value(&live_view, &desired_view);
    if diff::patch_is_empty(&patch) {
        return Ok(None);
    }

    let mut updated_view = serde_json::to_value(live).map_err(|err| Error::Diff {
        message: err.to_string(),
    })?;
    diff::apply_patch(&mut updated_view, &patch);
    let updated = serde_json::from_value(updated_view).map_err(|err| Error::Diff {
        message: err.to_string(),
    })?;
    Ok(Some(updated))
}

//! # Configuration Merge Engine
//!
//! This module provides the deep-merge machinery used to compose a layered
//! specification (cluster-level -> role-level -> role-group-level) into one
//! effective configuration per managed unit.
//!
//! ## Merge policy
//!
//! The policy is fixed and deterministic:
//!
//! - **Atomic leaf fields**: the overlay wins whenever its value is set
//!   (non-zero/non-empty under the [`Atomic`] contract); otherwise the
//!   original value is kept.
//! - **Map-valued fields**: recursive key-wise merge. Keys only in the
//!   overlay are added; keys present in both recurse.
//! - **Sequence-valued fields**: concatenation, original entries followed by
//!   overlay entries. Not replacement, not deduplication. This policy is
//!   deliberately non-idempotent: merging the same overlay twice duplicates
//!   entries. It is safe because resolution always starts from freshly
//!   deserialized tier fragments and never re-merges an already resolved
//!   value.
//!
//! ## The zero-value contract
//!
//! [`Atomic`] encodes "zero value = unset" explicitly per leaf type: an empty
//! string, a zero number, `false`, a zero duration and `None` are all unset.
//! Config types whose fields must be able to carry a meaningful zero (e.g. an
//! explicit `false`) wrap them in `Option`, where `Some` always counts as
//! set.
//!
//! ## Submodules
//!
//! - [`value`]: the untyped deep merge over raw `serde_json::Value` patch
//!   fragments.

pub mod value;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Leaf types that cannot be merged any further, together with their
/// explicit "zero value = unset" contract.
pub trait Atomic {
    /// Whether this value is the type's zero value and therefore unset.
    fn is_unset(&self) -> bool;
}

/// Deep merge under the fixed policy: atomic overlay-wins-when-set, map
/// deep-merge, sequence concatenation.
///
/// `original.merge(overlay)` returns the merged value; neither input is
/// mutated.
pub trait Merge: Sized {
    fn merge(&self, overlay: &Self) -> Self;
}

impl Atomic for String {
    fn is_unset(&self) -> bool {
        self.is_empty()
    }
}

impl Atomic for bool {
    fn is_unset(&self) -> bool {
        !*self
    }
}

impl Atomic for Duration {
    fn is_unset(&self) -> bool {
        self.is_zero()
    }
}

macro_rules! numeric_atomic {
    ($($t:ty),*) => {
        $(
            impl Atomic for $t {
                fn is_unset(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

numeric_atomic!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

macro_rules! atomic_merge {
    ($($t:ty),*) => {
        $(
            impl Merge for $t {
                fn merge(&self, overlay: &Self) -> Self {
                    if overlay.is_unset() {
                        self.clone()
                    } else {
                        overlay.clone()
                    }
                }
            }
        )*
    };
}

atomic_merge!(String, bool, Duration, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// `Some` always counts as set, so an explicit `Some(zero)` overrides.
impl<T: Atomic + Clone> Merge for Option<T> {
    fn merge(&self, overlay: &Self) -> Self {
        match overlay {
            Some(_) => overlay.clone(),
            None => self.clone(),
        }
    }
}

impl<T: Atomic> Atomic for Option<T> {
    fn is_unset(&self) -> bool {
        self.is_none()
    }
}

/// Sequences concatenate: original entries followed by overlay entries.
///
/// Deliberately non-idempotent: merging the same overlay twice duplicates
/// its entries. Resolution never re-merges a resolved value, so this cannot
/// compound across reconcile passes.
impl<T: Clone> Merge for Vec<T> {
    fn merge(&self, overlay: &Self) -> Self {
        let mut merged = self.clone();
        merged.extend(overlay.iter().cloned());
        merged
    }
}

/// Maps merge recursively key-wise; keys only in the overlay are added.
impl<V: Merge + Clone> Merge for BTreeMap<String, V> {
    fn merge(&self, overlay: &Self) -> Self {
        let mut merged = self.clone();
        for (key, overlay_value) in overlay {
            let combined = match merged.get(key) {
                Some(existing) => existing.merge(overlay_value),
                None => overlay_value.clone(),
            };
            merged.insert(key.clone(), combined);
        }
        merged
    }
}

/// A partial configuration fragment with four independently-mergeable facets.
///
/// One `OverrideSpec` may appear at each tier of the specification; the
/// resolver composes them in tier order (cluster -> role -> role-group) so the
/// finer tier's entries land after (and, for maps, on top of) the coarser
/// tier's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverrideSpec {
    /// Extra command-line arguments, concatenated across tiers.
    pub cli_args: Vec<String>,
    /// Environment variables, merged key-wise (finer tier wins).
    pub env: BTreeMap<String, String>,
    /// Per-file key/value overrides for generated configuration files,
    /// keyed by file name, merged key-wise within each file.
    pub config_files: BTreeMap<String, BTreeMap<String, String>>,
    /// Raw object-patch fragment applied to the built object's payload,
    /// merged under the [`value`] policy.
    pub patch: JsonValue,
}

impl OverrideSpec {
    /// Whether every facet is empty.
    pub fn is_empty(&self) -> bool {
        self.cli_args.is_empty()
            && self.env.is_empty()
            && self.config_files.is_empty()
            && self.patch.is_null()
    }
}

impl Merge for OverrideSpec {
    fn merge(&self, overlay: &Self) -> Self {
        Self {
            cli_args: self.cli_args.merge(&overlay.cli_args),
            env: self.env.merge(&overlay.env),
            config_files: self.config_files.merge(&overlay.config_files),
            patch: value::merged(&self.patch, &overlay.patch),
        }
    }
}

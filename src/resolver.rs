//! # Tiered Specification and Override Resolution
//!
//! This module defines the layered specification structures (cluster-level ->
//! role-level -> role-group-level) and the resolver that flattens them into
//! one [`EffectiveConfig`] per role-group.
//!
//! ## Resolution semantics
//!
//! Typed config fields use a shallow, field-by-field copy-down ([`Inherit`]):
//! a role-group field takes the role-level value only when it is zero-valued
//! in the role-group. Precedence is explicit-at-role-group >
//! inherited-from-role > default. This is deliberately not a deep merge: a
//! field set at the role-group level survives unchanged regardless of the
//! role-level value.
//!
//! Override fragments ([`OverrideSpec`]) instead compose through the merge
//! engine in tier order cluster -> role -> role-group, so CLI arguments
//! concatenate coarse-to-fine and map entries from finer tiers win.
//!
//! The resolver always works on an owned copy per role-group. Sibling
//! role-groups never observe each other's inherited values, and resolving
//! never mutates the specification it reads from.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::merge::{Atomic, Merge, OverrideSpec};

/// Shallow field-by-field copy-down from a parent tier.
///
/// Implementations are hand-written per config type: each field checks its
/// own zero-value contract (`Atomic::is_unset`, or `Option::is_none`) and
/// takes the parent's value only when unset. In a language without
/// reflection this explicit per-type contract is what makes inheritance
/// type-safe.
pub trait Inherit {
    fn inherit_from(&mut self, parent: &Self);
}

/// Cluster-wide operation flags controlling the reconcile pass.
///
/// `paused` suspends reconciliation entirely, leaving live state untouched.
/// `stopped` is different: a stopped cluster still actively converges, but
/// every workload is driven to zero replicas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterOperation {
    /// Skip reconciliation entirely, touching nothing.
    pub reconciliation_paused: bool,
    /// Converge all workloads to zero replicas.
    pub stopped: bool,
}

/// Disruption-budget settings for a cluster's workloads.
///
/// Exactly one of `max_unavailable` and `min_available` must be set; the two
/// fields are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisruptionBudget {
    pub max_unavailable: Option<u16>,
    pub min_available: Option<u16>,
}

impl DisruptionBudget {
    /// Validate the mutual-exclusion contract.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when both or neither of the fields are set.
    pub fn validate(&self) -> Result<()> {
        match (self.max_unavailable, self.min_available) {
            (Some(_), Some(_)) => Err(Error::Config {
                message: "maxUnavailable and minAvailable are mutually exclusive".to_string(),
                hint: Some("set exactly one of the two fields".to_string()),
            }),
            (None, None) => Err(Error::Config {
                message: "disruption budget requires maxUnavailable or minAvailable".to_string(),
                hint: Some("set exactly one of the two fields, or omit the budget".to_string()),
            }),
            _ => Ok(()),
        }
    }
}

/// The user-authored cluster-level specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", bound(
    serialize = "T: Serialize",
    deserialize = "T: Deserialize<'de> + Default"
))]
pub struct ClusterSpec<T> {
    /// Overrides applied to every role-group of the cluster.
    pub overrides: OverrideSpec,
    /// Pause/stop flags.
    pub cluster_operation: ClusterOperation,
    /// Optional disruption budget; validated before resolution.
    pub disruption_budget: Option<DisruptionBudget>,
    /// Roles of the cluster, keyed by role name (keys are unique among
    /// siblings by construction).
    pub roles: BTreeMap<String, RoleSpec<T>>,
}

/// One role of the cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", bound(
    serialize = "T: Serialize",
    deserialize = "T: Deserialize<'de> + Default"
))]
pub struct RoleSpec<T> {
    /// Role-level config, inherited by role-groups field-by-field.
    pub config: T,
    /// Overrides applied to every role-group of this role.
    pub overrides: OverrideSpec,
    /// Role-groups, keyed by group name (unique among siblings by
    /// construction).
    pub role_groups: BTreeMap<String, RoleGroupSpec<T>>,
}

/// One role-group: the finest-grained deployment grouping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", bound(
    serialize = "T: Serialize",
    deserialize = "T: Deserialize<'de> + Default"
))]
pub struct RoleGroupSpec<T> {
    /// Desired replica count for the backing workload.
    pub replicas: Option<u16>,
    /// Role-group config; zero-valued fields inherit from the role level.
    pub config: T,
    /// Role-group overrides, composed last (finest tier).
    pub overrides: OverrideSpec,
}

/// The fully resolved configuration for one role-group.
///
/// Immutable once computed: fields are private, accessors borrow, and there
/// are no mutators. Each resolution produces freshly owned data.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig<T> {
    role: String,
    group: String,
    replicas: u16,
    config: T,
    overrides: OverrideSpec,
}

impl<T> EffectiveConfig<T> {
    /// The role name this config belongs to.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// The role-group name this config belongs to.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Resolved replica count (defaults to 1 when the spec omits it).
    pub fn replicas(&self) -> u16 {
        self.replicas
    }

    /// The resolved typed config.
    pub fn config(&self) -> &T {
        &self.config
    }

    /// The composed override fragments, cluster -> role -> role-group.
    pub fn overrides(&self) -> &OverrideSpec {
        &self.overrides
    }
}

impl<T> ClusterSpec<T>
where
    T: Clone + Inherit,
{
    /// Validate cluster-wide constraints that must hold before any write.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid disruption budget.
    pub fn validate(&self) -> Result<()> {
        if let Some(budget) = &self.disruption_budget {
            budget.validate()?;
        }
        Ok(())
    }

    /// Resolve every role-group of one role.
    ///
    /// Returns the resolved configs keyed by role-group name.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the role does not exist or cluster
    /// validation fails.
    pub fn resolve_role(&self, role_name: &str) -> Result<BTreeMap<String, EffectiveConfig<T>>> {
        self.validate()?;
        let role = self.roles.get(role_name).ok_or_else(|| Error::Config {
            message: format!("unknown role: {:?}", role_name),
            hint: None,
        })?;

        let mut resolved = BTreeMap::new();
        for (group_name, group_spec) in &role.role_groups {
            // Owned copy first: siblings must never observe each other's
            // inherited values, and the spec itself stays untouched.
            let mut config = group_spec.config.clone();
            config.inherit_from(&role.config);

            let overrides = self
                .overrides
                .merge(&role.overrides)
                .merge(&group_spec.overrides);

            resolved.insert(
                group_name.clone(),
                EffectiveConfig {
                    role: role_name.to_string(),
                    group: group_name.clone(),
                    replicas: group_spec.replicas.unwrap_or(1),
                    config,
                    overrides,
                },
            );
        }
        Ok(resolved)
    }

    /// Resolve every role-group of every role, keyed role -> group.
    pub fn resolve_all(&self) -> Result<BTreeMap<String, BTreeMap<String, EffectiveConfig<T>>>> {
        let mut resolved = BTreeMap::new();
        for role_name in self.roles.keys() {
            resolved.insert(role_name.clone(), self.resolve_role(role_name)?);
        }
        Ok(resolved)
    }
}

impl<T> ClusterSpec<T>
where
    T: DeserializeOwned + Default,
{
    /// Parse a cluster specification from user-authored YAML.
    ///
    /// # Errors
    ///
    /// Returns `Error::Yaml` for malformed documents.
    pub fn from_yaml(input: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(input)?)
    }
}

/// Compute resources for one role-group's workload containers.
///
/// A small concrete config type shipped with the library; product operators
/// typically embed it in their own role config structs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceConfig {
    /// CPU request/limit (e.g. "500m")
    pub cpu: String,
    /// Memory request/limit (e.g. "2Gi")
    pub memory: String,
    /// Storage capacity for persistent volumes (e.g. "10Gi")
    pub storage: String,
}

impl Inherit for ResourceConfig {
    fn inherit_from(&mut self, parent: &Self) {
        if self.cpu.is_unset() {
            self.cpu = parent.cpu.clone();
        }
        if self.memory.is_unset() {
            self.memory = parent.memory.clone();
        }
        if self.storage.is_unset() {
            self.storage = parent.storage.clone();
        }
    }
}

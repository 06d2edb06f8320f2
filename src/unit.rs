//! # Managed Unit Identity and Labeling
//!
//! A managed unit is a cluster, role, or role-group identity: a strict
//! three-level tree in which the cluster owns roles and roles own
//! role-groups. Units compute the canonical names and label sets that every
//! derived object carries.
//!
//! ## Naming
//!
//! Names compose hierarchically: `{cluster}`, `{cluster}-{role}`,
//! `{cluster}-{role}-{roleGroup}`. Each segment must be a valid DNS-1123
//! label; uniqueness among siblings is enforced where the tree is declared
//! (role and role-group names are spec map keys).
//!
//! ## Labels
//!
//! Label sets are computed lazily and cached per unit instance. Every
//! accessor returns an independent copy: mutating a returned map never
//! affects subsequent calls or other holders. The selector subset returned by
//! `matching_labels` is filtered from the same computed set used for applied
//! labels, so selector ⊆ labels holds by construction and the two can never
//! diverge.
//!
//! A unit's label cache is not safe for concurrent mutation from multiple
//! callers; each unit instance is single-owner for the duration of one
//! reconcile pass.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::object::{OwnerReference, TypeMeta};

/// Label key carrying the cluster name on every derived object.
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
/// Label key carrying the managing controller's domain.
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
/// Label key carrying the role name on role and role-group objects.
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
/// Label key carrying the role-group name on role-group objects.
pub const LABEL_ROLE_GROUP: &str = "app.kubernetes.io/role-group";

/// The identity keys used for selectors. Extra caller-supplied labels are
/// applied but never selected on.
const SELECTOR_KEYS: [&str; 4] = [
    LABEL_INSTANCE,
    LABEL_MANAGED_BY,
    LABEL_COMPONENT,
    LABEL_ROLE_GROUP,
];

fn name_segment_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").unwrap())
}

/// Validate one name segment (cluster, role, or role-group name) as a
/// DNS-1123 label.
fn validate_segment(segment: &str, what: &str) -> Result<()> {
    if segment.is_empty() || segment.len() > 63 || !name_segment_regex().is_match(segment) {
        return Err(Error::Config {
            message: format!("invalid {} name: {:?}", what, segment),
            hint: Some(
                "names must be lowercase alphanumeric or '-', start and end alphanumeric, \
                 and be at most 63 characters"
                    .to_string(),
            ),
        });
    }
    Ok(())
}

/// Common accessors shared by all three unit levels.
pub trait ManagedUnit {
    /// Canonical composed name of the unit.
    fn name(&self) -> String;

    /// Namespace the unit's derived objects live in.
    fn namespace(&self) -> &str;

    /// Full applied label set. Returns an independent copy; the cached
    /// internal state is never exposed.
    fn labels(&self) -> BTreeMap<String, String>;

    /// Selector label subset, filtered from the same set `labels` returns.
    /// Always a subset of `labels`.
    fn matching_labels(&self) -> BTreeMap<String, String> {
        let mut labels = self.labels();
        labels.retain(|key, _| SELECTOR_KEYS.contains(&key.as_str()));
        labels
    }

    /// Owner reference linking derived objects back to the cluster's own
    /// resource. `None` when the cluster has no store-assigned identity yet.
    fn owner_reference(&self) -> Option<OwnerReference>;
}

/// The root of the unit tree: one managed cluster.
#[derive(Debug, Clone)]
pub struct ClusterUnit {
    domain: String,
    name: String,
    namespace: String,
    types: Option<TypeMeta>,
    uid: Option<String>,
    extra_labels: BTreeMap<String, String>,
    labels_cache: OnceCell<BTreeMap<String, String>>,
}

impl ClusterUnit {
    /// Create a cluster unit.
    ///
    /// `domain` identifies the managing controller (the `managed-by` label
    /// value); `name` is the cluster name, `namespace` the namespace derived
    /// objects are created in.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the cluster name is not a valid DNS-1123
    /// label.
    pub fn new(domain: &str, name: &str, namespace: &str) -> Result<Self> {
        validate_segment(name, "cluster")?;
        Ok(Self {
            domain: domain.to_string(),
            name: name.to_string(),
            namespace: namespace.to_string(),
            types: None,
            uid: None,
            extra_labels: BTreeMap::new(),
            labels_cache: OnceCell::new(),
        })
    }

    /// Attach the cluster resource's own type identity and uid, enabling
    /// owner-reference attachment on derived objects.
    pub fn with_identity(mut self, types: TypeMeta, uid: &str) -> Self {
        self.types = Some(types);
        self.uid = Some(uid.to_string());
        self
    }

    /// Add caller-supplied labels applied to every derived object. Extra
    /// labels are never part of the selector subset, and the identity keys
    /// cannot be overridden by them.
    pub fn with_extra_labels(mut self, extra: BTreeMap<String, String>) -> Self {
        self.extra_labels = extra;
        self
    }

    /// Derive the role unit for a role of this cluster.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the role name is not a valid DNS-1123
    /// label.
    pub fn role(&self, role: &str) -> Result<RoleUnit> {
        validate_segment(role, "role")?;
        Ok(RoleUnit {
            cluster: self.clone(),
            role: role.to_string(),
            labels_cache: OnceCell::new(),
        })
    }
}

impl ManagedUnit for ClusterUnit {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn labels(&self) -> BTreeMap<String, String> {
        self.labels_cache
            .get_or_init(|| {
                let mut labels = self.extra_labels.clone();
                labels.insert(LABEL_INSTANCE.to_string(), self.name.clone());
                labels.insert(LABEL_MANAGED_BY.to_string(), self.domain.clone());
                labels
            })
            .clone()
    }

    fn owner_reference(&self) -> Option<OwnerReference> {
        let types = self.types.as_ref()?;
        let uid = self.uid.as_ref()?;
        Some(OwnerReference {
            api_version: types.api_version(),
            kind: types.kind.clone(),
            name: self.name.clone(),
            uid: uid.clone(),
            controller: true,
        })
    }
}

/// One role of a cluster (e.g. "server", "worker").
#[derive(Debug, Clone)]
pub struct RoleUnit {
    cluster: ClusterUnit,
    role: String,
    labels_cache: OnceCell<BTreeMap<String, String>>,
}

impl RoleUnit {
    /// The role name segment (not the composed unit name).
    pub fn role_name(&self) -> &str {
        &self.role
    }

    /// Derive the role-group unit for a group of this role.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the group name is not a valid DNS-1123
    /// label.
    pub fn group(&self, group: &str) -> Result<RoleGroupUnit> {
        validate_segment(group, "role-group")?;
        Ok(RoleGroupUnit {
            role: self.clone(),
            group: group.to_string(),
            labels_cache: OnceCell::new(),
        })
    }
}

impl ManagedUnit for RoleUnit {
    fn name(&self) -> String {
        format!("{}-{}", self.cluster.name, self.role)
    }

    fn namespace(&self) -> &str {
        self.cluster.namespace()
    }

    fn labels(&self) -> BTreeMap<String, String> {
        self.labels_cache
            .get_or_init(|| {
                let mut labels = self.cluster.labels();
                labels.insert(LABEL_COMPONENT.to_string(), self.role.clone());
                labels
            })
            .clone()
    }

    fn owner_reference(&self) -> Option<OwnerReference> {
        self.cluster.owner_reference()
    }
}

/// One role-group of a role: the finest-grained unit, typically backing one
/// workload object.
#[derive(Debug, Clone)]
pub struct RoleGroupUnit {
    role: RoleUnit,
    group: String,
    labels_cache: OnceCell<BTreeMap<String, String>>,
}

impl RoleGroupUnit {
    /// The role-group name segment (not the composed unit name).
    pub fn group_name(&self) -> &str {
        &self.group
    }
}

impl ManagedUnit for RoleGroupUnit {
    fn name(&self) -> String {
        format!("{}-{}", self.role.name(), self.group)
    }

    fn namespace(&self) -> &str {
        self.role.namespace()
    }

    fn labels(&self) -> BTreeMap<String, String> {
        self.labels_cache
            .get_or_init(|| {
                let mut labels = self.role.labels();
                labels.insert(LABEL_ROLE_GROUP.to_string(), self.group.clone());
                labels
            })
            .clone()
    }

    fn owner_reference(&self) -> Option<OwnerReference> {
        self.role.owner_reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> ClusterUnit {
        ClusterUnit::new("database-operator", "db", "prod").unwrap()
    }

    mod naming_tests {
        use super::*;

        #[test]
        fn test_names_compose_hierarchically() {
            let cluster = cluster();
            let role = cluster.role("server").unwrap();
            let group = role.group("default").unwrap();

            assert_eq!(cluster.name(), "db");
            assert_eq!(role.name(), "db-server");
            assert_eq!(group.name(), "db-server-default");
        }

        #[test]
        fn test_namespace_is_inherited() {
            let group = cluster().role("server").unwrap().group("default").unwrap();
            assert_eq!(group.namespace(), "prod");
        }

        #[test]
        fn test_invalid_cluster_name_rejected() {
            let result = ClusterUnit::new("database-operator", "Db_Cluster", "prod");
            assert!(matches!(result, Err(Error::Config { .. })));
        }

        #[test]
        fn test_invalid_role_name_rejected() {
            let result = cluster().role("-server");
            assert!(matches!(result, Err(Error::Config { .. })));
        }

        #[test]
        fn test_overlong_segment_rejected() {
            let long = "a".repeat(64);
            let result = cluster().role(&long);
            assert!(matches!(result, Err(Error::Config { .. })));
        }
    }

    mod label_tests {
        use super::*;

        #[test]
        fn test_cluster_minimum_labels() {
            let labels = cluster().labels();
            assert_eq!(labels.get(LABEL_INSTANCE).unwrap(), "db");
            assert_eq!(labels.get(LABEL_MANAGED_BY).unwrap(), "database-operator");
            assert!(!labels.contains_key(LABEL_COMPONENT));
        }

        #[test]
        fn test_role_adds_component() {
            let labels = cluster().role("server").unwrap().labels();
            assert_eq!(labels.get(LABEL_COMPONENT).unwrap(), "server");
            assert!(!labels.contains_key(LABEL_ROLE_GROUP));
        }

        #[test]
        fn test_role_group_adds_group_label() {
            let labels = cluster()
                .role("server")
                .unwrap()
                .group("default")
                .unwrap()
                .labels();
            assert_eq!(labels.get(LABEL_ROLE_GROUP).unwrap(), "default");
        }

        #[test]
        fn test_returned_labels_are_independent_copies() {
            // The single most safety-critical invariant of this module:
            // mutating a returned map must never leak into the cache or
            // any other holder's copy.
            let unit = cluster().role("server").unwrap();

            let mut first = unit.labels();
            first.insert("mutated".to_string(), "yes".to_string());
            first.remove(LABEL_COMPONENT);

            let second = unit.labels();
            assert!(!second.contains_key("mutated"));
            assert_eq!(second.get(LABEL_COMPONENT).unwrap(), "server");
            assert_ne!(first, second);
        }

        #[test]
        fn test_extra_labels_applied_but_not_selected() {
            let mut extra = BTreeMap::new();
            extra.insert("team".to_string(), "data-platform".to_string());
            let unit = ClusterUnit::new("database-operator", "db", "prod")
                .unwrap()
                .with_extra_labels(extra)
                .role("server")
                .unwrap();

            assert_eq!(unit.labels().get("team").unwrap(), "data-platform");
            assert!(!unit.matching_labels().contains_key("team"));
        }

        #[test]
        fn test_extra_labels_cannot_shadow_identity_keys() {
            let mut extra = BTreeMap::new();
            extra.insert(LABEL_INSTANCE.to_string(), "impostor".to_string());
            let unit = ClusterUnit::new("database-operator", "db", "prod")
                .unwrap()
                .with_extra_labels(extra);

            assert_eq!(unit.labels().get(LABEL_INSTANCE).unwrap(), "db");
        }

        #[test]
        fn test_matching_labels_subset_of_labels() {
            let group = cluster().role("server").unwrap().group("default").unwrap();
            let labels = group.labels();
            for (key, value) in group.matching_labels() {
                assert_eq!(labels.get(&key), Some(&value));
            }
        }
    }

    mod owner_reference_tests {
        use super::*;

        #[test]
        fn test_no_identity_means_no_owner_reference() {
            let group = cluster().role("server").unwrap().group("default").unwrap();
            assert!(group.owner_reference().is_none());
        }

        #[test]
        fn test_owner_reference_points_at_cluster() {
            let cluster = ClusterUnit::new("database-operator", "db", "prod")
                .unwrap()
                .with_identity(TypeMeta::new("example.dev", "v1", "DatabaseCluster"), "u-7");
            let group = cluster.role("server").unwrap().group("default").unwrap();

            let owner = group.owner_reference().unwrap();
            assert_eq!(owner.api_version, "example.dev/v1");
            assert_eq!(owner.kind, "DatabaseCluster");
            assert_eq!(owner.name, "db");
            assert_eq!(owner.uid, "u-7");
            assert!(owner.controller);
        }
    }
}

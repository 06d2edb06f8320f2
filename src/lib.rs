//! # Converge Kit
//!
//! This library provides the core machinery for building controllers that
//! converge externally declared specifications into a set of managed objects
//! inside a declarative cluster-orchestration platform. It is designed to be
//! embedded by product operators: they supply resource-kind builders and the
//! platform API client, the library supplies configuration resolution,
//! idempotent convergence, and reconcile orchestration.
//!
//! ## Quick Example
//!
//! ```
//! use converge_kit::resolver::{ClusterSpec, ResourceConfig};
//! use converge_kit::unit::{ClusterUnit, ManagedUnit};
//!
//! // Parse a user-authored, tiered cluster specification
//! let spec: ClusterSpec<ResourceConfig> = ClusterSpec::from_yaml(
//!     r#"
//! roles:
//!   server:
//!     config:
//!       memory: 2Gi
//!     roleGroups:
//!       default:
//!         replicas: 2
//! "#,
//! )
//! .unwrap();
//!
//! // Resolve one effective configuration per role-group
//! let resolved = spec.resolve_role("server").unwrap();
//! assert_eq!(resolved["default"].replicas(), 2);
//! assert_eq!(resolved["default"].config().memory, "2Gi");
//!
//! // Derive the matching unit identity and label sets
//! let unit = ClusterUnit::new("database-operator", "db", "prod")
//!     .unwrap()
//!     .role("server")
//!     .unwrap()
//!     .group("default")
//!     .unwrap();
//! assert_eq!(unit.name(), "db-server-default");
//! assert!(unit.matching_labels().len() <= unit.labels().len());
//! ```
//!
//! ## Core Concepts
//!
//! The library is built around a few key concepts:
//!
//! - **Merge Engine (`merge`)**: deep-merges partially-specified
//!   configuration fragments under a fixed policy (atomic override-wins,
//!   map deep-merge, sequence concatenation).
//! - **Override Resolver (`resolver`)**: applies three-tier field
//!   inheritance (cluster -> role -> role-group) to produce one immutable
//!   effective configuration per role-group.
//! - **Unit Identity (`unit`)**: computes canonical names and label sets
//!   hierarchically from cluster/role/role-group identity; label caches are
//!   never exposed mutably.
//! - **Converge Engine (`converge`)**: given a desired object and the live
//!   state in the store, decides create/patch/no-op, preserves
//!   externally-assigned fields, and reports whether a visible mutation
//!   occurred.
//! - **Reconcile Orchestration (`reconcile`)**: a tree of composable units
//!   executing children in registration order with pause/stop semantics and
//!   requeue propagation.
//! - **Object Store (`store`)**: the external API abstraction, with an
//!   in-memory implementation for tests and dry runs.
//!
//! ## Execution Flow
//!
//! An embedding operator typically performs these steps per reconcile
//! trigger:
//!
//! 1.  **Parse** the user-authored specification (`resolver::ClusterSpec`).
//! 2.  **Resolve** one `EffectiveConfig` per role-group.
//! 3.  **Assemble** a `reconcile::orchestrator::CompositeReconciler` tree:
//!     one child per derived object, in dependency order.
//! 4.  **Reconcile**: the tree converges each object through the
//!     `converge::Converger` and short-circuits on the first child that
//!     mutated something.
//! 5.  **Requeue**: return the resulting `Outcome` to the external control
//!     loop, which reschedules with backoff.
//!
//! The library is single-threaded and synchronous per reconcile invocation;
//! concurrency across distinct clusters is owned by the external control
//! loop. Logging goes through the `log` facade and the embedding process
//! installs the sink.

pub mod converge;
pub mod error;
pub mod merge;
pub mod object;
pub mod reconcile;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod unit;

#[cfg(test)]
mod merge_proptest;

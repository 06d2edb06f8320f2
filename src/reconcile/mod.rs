//! # Reconcile Orchestration
//!
//! A reconcile pass walks a tree of composable units: each unit owns an
//! ordered list of children (leaf object reconcilers or nested units) and
//! coordinates pause/stop semantics, execution order, and requeue
//! propagation.
//!
//! ## Control flow
//!
//! - `reconcile` executes children in registration order. The first child
//!   reporting "needs requeue" (a visible mutation, or an explicit backoff)
//!   short-circuits the remaining children for this pass and returns that
//!   signal upward. This settle-in-order design means dependent resources are
//!   only touched once earlier ones have stabilized.
//! - `ready` mirrors the control flow but aggregates readiness, short-
//!   circuiting on the first not-ready child.
//! - A paused cluster short-circuits both operations to settled/no-op
//!   without invoking any child. A stopped cluster is different: children
//!   still reconcile, but workload-owning children force their desired
//!   replica count to zero.
//!
//! Execution is single-threaded, synchronous, and cooperative per
//! invocation; the external control loop owns cadence and retry (driven by
//! the returned [`Outcome`]).
//!
//! ## Modules
//!
//! - [`orchestrator`]: the composite unit tree.
//! - [`workload`]: leaf reconcilers wrapping resource-kind builders.

pub mod orchestrator;
pub mod workload;

use std::time::Duration;

use crate::error::Result;
use crate::resolver::ClusterOperation;

/// The requeue signal returned by every reconcile step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing changed; no requeue needed.
    Settled,
    /// A visible mutation occurred; the external scheduler should requeue
    /// promptly.
    Requeue,
    /// Requeue after an explicit backoff.
    RequeueAfter(Duration),
}

impl Outcome {
    /// Whether this outcome asks the external scheduler to run another pass.
    pub fn needs_requeue(&self) -> bool {
        !matches!(self, Outcome::Settled)
    }
}

/// Per-pass context handed down the unit tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileContext {
    /// Skip reconciliation entirely, leaving live state untouched.
    pub paused: bool,
    /// Actively converge workloads to zero replicas.
    pub stopped: bool,
}

impl ReconcileContext {
    /// Derive the context from the cluster spec's operation flags.
    pub fn from_operation(operation: &ClusterOperation) -> Self {
        Self {
            paused: operation.reconciliation_paused,
            stopped: operation.stopped,
        }
    }
}

/// One reconcilable unit: a leaf object reconciler or a nested unit tree.
pub trait Reconcile {
    /// Drive owned state toward the desired state, returning the requeue
    /// signal.
    fn reconcile(&mut self, ctx: &ReconcileContext) -> Result<Outcome>;

    /// Whether the owned state has converged and is serving.
    fn ready(&mut self, ctx: &ReconcileContext) -> Result<bool>;
}

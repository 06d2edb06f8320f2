//! The composite unit tree coordinating a full reconcile pass.
//!
//! A [`CompositeReconciler`] owns an ordered list of children and is itself a
//! [`Reconcile`], so trees nest: a cluster unit owns role units, role units
//! own role-group units, and role-group units own leaf object reconcilers.

use log::debug;

use super::{Outcome, Reconcile, ReconcileContext};
use crate::error::Result;

/// A unit owning an ordered list of child reconcilable units.
pub struct CompositeReconciler {
    name: String,
    children: Vec<Box<dyn Reconcile>>,
}

impl CompositeReconciler {
    /// Create an empty composite unit. `name` is used only for logging.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
        }
    }

    /// Append a child. Children execute in registration order, so register
    /// dependencies before their dependents.
    pub fn register(&mut self, child: Box<dyn Reconcile>) {
        self.children.push(child);
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the unit has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Reconcile for CompositeReconciler {
    fn reconcile(&mut self, ctx: &ReconcileContext) -> Result<Outcome> {
        if ctx.paused {
            debug!("{}: reconciliation paused, touching nothing", self.name);
            return Ok(Outcome::Settled);
        }

        for child in &mut self.children {
            let outcome = child.reconcile(ctx)?;
            if outcome.needs_requeue() {
                // Settle-in-order: later children wait until this one has
                // stabilized.
                return Ok(outcome);
            }
        }
        Ok(Outcome::Settled)
    }

    fn ready(&mut self, ctx: &ReconcileContext) -> Result<bool> {
        if ctx.paused {
            return Ok(true);
        }

        for child in &mut self.children {
            if !child.ready(ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

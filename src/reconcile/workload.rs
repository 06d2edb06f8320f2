//! Leaf reconcilers wrapping resource-kind builders.
//!
//! A resource-kind plugin supplies [`BuildObject`]: produce the desired
//! object for this pass. Internally a plugin may compose whatever capability
//! mixins it likes (replica count, container list, volume list, affinity,
//! grace period); the orchestrator never inspects them individually, it
//! calls only build and ready on the whole.
//!
//! Two leaf shapes exist:
//!
//! - [`ObjectReconciler`]: converges any derived object. The create-only
//!   mode never overwrites after creation, for artifacts such as generated
//!   credentials.
//! - [`WorkloadReconciler`]: additionally interprets the cluster stop flag
//!   by forcing the built workload's scale to zero (a stopped cluster still
//!   actively converges toward a scaled-to-zero state, it does not skip),
//!   and derives readiness from live status.

use log::debug;
use serde_json::{json, Value as JsonValue};

use super::{Outcome, Reconcile, ReconcileContext};
use crate::converge::Converger;
use crate::error::{Error, Result};
use crate::object::{Object, OwnerReference};
use crate::store::ObjectStore;

/// The resource-kind plugin seam: produce the desired object for one pass.
pub trait BuildObject {
    fn build(&self, ctx: &ReconcileContext) -> Result<Object>;
}

/// Closures are builders, which keeps simple artifacts simple.
impl<F> BuildObject for F
where
    F: Fn(&ReconcileContext) -> Result<Object>,
{
    fn build(&self, ctx: &ReconcileContext) -> Result<Object> {
        self(ctx)
    }
}

/// Leaf reconciler converging one derived object per pass.
pub struct ObjectReconciler<S, B> {
    converger: Converger<S>,
    owner: Option<OwnerReference>,
    builder: B,
    create_only: bool,
}

impl<S: ObjectStore, B: BuildObject> ObjectReconciler<S, B> {
    /// Converge the built object on every pass (create or patch).
    pub fn new(converger: Converger<S>, owner: Option<OwnerReference>, builder: B) -> Self {
        Self {
            converger,
            owner,
            builder,
            create_only: false,
        }
    }

    /// Create the built object if absent and never touch it again, for
    /// artifacts that must not be overwritten post-creation.
    pub fn create_only(converger: Converger<S>, owner: Option<OwnerReference>, builder: B) -> Self {
        Self {
            converger,
            owner,
            builder,
            create_only: true,
        }
    }
}

impl<S: ObjectStore, B: BuildObject> Reconcile for ObjectReconciler<S, B> {
    fn reconcile(&mut self, ctx: &ReconcileContext) -> Result<Outcome> {
        let desired = self.builder.build(ctx)?;
        let mutated = if self.create_only {
            self.converger.create_if_absent(self.owner.as_ref(), desired)?
        } else {
            self.converger.apply(self.owner.as_ref(), desired)?
        };
        Ok(if mutated {
            Outcome::Requeue
        } else {
            Outcome::Settled
        })
    }

    fn ready(&mut self, _ctx: &ReconcileContext) -> Result<bool> {
        // Plain artifacts have no live status to wait for; they are ready
        // once converged.
        Ok(true)
    }
}

/// Leaf reconciler for workload-owning role-groups.
pub struct WorkloadReconciler<S, B> {
    converger: Converger<S>,
    owner: Option<OwnerReference>,
    builder: B,
}

impl<S: ObjectStore, B: BuildObject> WorkloadReconciler<S, B> {
    pub fn new(converger: Converger<S>, owner: Option<OwnerReference>, builder: B) -> Self {
        Self {
            converger,
            owner,
            builder,
        }
    }
}

impl<S: ObjectStore, B: BuildObject> Reconcile for WorkloadReconciler<S, B> {
    fn reconcile(&mut self, ctx: &ReconcileContext) -> Result<Outcome> {
        let mut desired = self.builder.build(ctx)?;
        if ctx.stopped {
            debug!(
                "{}: cluster stopped, converging to zero replicas",
                desired.metadata.name
            );
            force_scale_to_zero(&mut desired);
        }

        let mutated = self.converger.apply(self.owner.as_ref(), desired)?;
        Ok(if mutated {
            Outcome::Requeue
        } else {
            Outcome::Settled
        })
    }

    fn ready(&mut self, ctx: &ReconcileContext) -> Result<bool> {
        let desired = self.builder.build(ctx)?;
        let info = self.converger.registry().resolve(&desired.kind)?;
        let key = desired.reference(&info.types);

        match self.converger.store().get(&key) {
            Ok(live) => Ok(workload_ready(&live)),
            Err(Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Force a built workload's desired scale to zero. Run-to-completion units
/// scale via parallelism, everything else via the replica count.
fn force_scale_to_zero(desired: &mut Object) {
    let field = if desired.kind == "Job" {
        "parallelism"
    } else {
        "replicas"
    };
    if desired.spec.is_null() {
        desired.spec = JsonValue::Object(serde_json::Map::new());
    }
    if let Some(spec) = desired.spec.as_object_mut() {
        spec.insert(field.to_string(), json!(0));
    }
}

/// Derive readiness from a live workload's status: ready replicas against
/// the desired replica count, or succeeded count against parallelism for
/// run-to-completion units.
pub fn workload_ready(live: &Object) -> bool {
    match live.kind.as_str() {
        "Job" => {
            let parallelism = spec_count(live, "parallelism").unwrap_or(1);
            let succeeded = status_count(live, "succeeded").unwrap_or(0);
            succeeded >= parallelism
        }
        _ => {
            let desired = spec_count(live, "replicas").unwrap_or(1);
            let ready = status_count(live, "readyReplicas").unwrap_or(0);
            ready >= desired
        }
    }
}

fn spec_count(object: &Object, field: &str) -> Option<u64> {
    object.spec.get(field).and_then(JsonValue::as_u64)
}

fn status_count(object: &Object, field: &str) -> Option<u64> {
    object.status.get(field).and_then(JsonValue::as_u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use crate::store::MemoryStore;
    use crate::object::ObjectRef;

    fn converger() -> Converger<MemoryStore> {
        Converger::new(MemoryStore::new(), TypeRegistry::with_builtin_kinds())
    }

    fn workload_builder(replicas: u64) -> impl Fn(&ReconcileContext) -> Result<Object> {
        move |_ctx: &ReconcileContext| {
            let mut object = Object::new("StatefulSet", "db-server-default");
            object.metadata.namespace = Some("prod".to_string());
            object.spec = json!({"replicas": replicas, "serviceName": "db-server"});
            Ok(object)
        }
    }

    fn workload_key(engine: &Converger<MemoryStore>) -> ObjectRef {
        let info = engine.registry().resolve("StatefulSet").unwrap();
        let mut object = Object::new("StatefulSet", "db-server-default");
        object.metadata.namespace = Some("prod".to_string());
        object.reference(&info.types)
    }

    mod workload_reconcile_tests {
        use super::*;

        #[test]
        fn test_first_pass_creates_and_requeues() {
            let engine = converger();
            let mut unit = WorkloadReconciler::new(engine.clone(), None, workload_builder(3));

            let outcome = unit.reconcile(&ReconcileContext::default()).unwrap();
            assert_eq!(outcome, Outcome::Requeue);
            let stored = engine.store().get(&workload_key(&engine)).unwrap();
            assert_eq!(stored.spec["replicas"], 3);
        }

        #[test]
        fn test_settles_once_converged() {
            let engine = converger();
            let mut unit = WorkloadReconciler::new(engine.clone(), None, workload_builder(3));

            unit.reconcile(&ReconcileContext::default()).unwrap();
            let outcome = unit.reconcile(&ReconcileContext::default()).unwrap();
            assert_eq!(outcome, Outcome::Settled);
        }

        #[test]
        fn test_stop_converges_to_zero_replicas() {
            let engine = converger();
            let mut unit = WorkloadReconciler::new(engine.clone(), None, workload_builder(3));
            unit.reconcile(&ReconcileContext::default()).unwrap();

            // Stopping does not skip reconciliation: the workload is
            // actively driven to zero.
            let ctx = ReconcileContext {
                paused: false,
                stopped: true,
            };
            let outcome = unit.reconcile(&ctx).unwrap();
            assert_eq!(outcome, Outcome::Requeue);

            let stored = engine.store().get(&workload_key(&engine)).unwrap();
            assert_eq!(stored.spec["replicas"], 0);
        }
    }

    mod readiness_tests {
        use super::*;

        #[test]
        fn test_absent_workload_is_not_ready() {
            let engine = converger();
            let mut unit = WorkloadReconciler::new(engine, None, workload_builder(3));
            assert!(!unit.ready(&ReconcileContext::default()).unwrap());
        }

        #[test]
        fn test_ready_tracks_live_status() {
            let engine = converger();
            let mut unit = WorkloadReconciler::new(engine.clone(), None, workload_builder(3));
            unit.reconcile(&ReconcileContext::default()).unwrap();

            // No status yet: not ready.
            assert!(!unit.ready(&ReconcileContext::default()).unwrap());

            // Status catches up: ready.
            let key = workload_key(&engine);
            let mut live = engine.store().get(&key).unwrap();
            live.status = json!({"readyReplicas": 3});
            engine.store().update(&key, live).unwrap();
            assert!(unit.ready(&ReconcileContext::default()).unwrap());
        }

        #[test]
        fn test_job_readiness_uses_succeeded_count() {
            let mut complete = Object::new("Job", "init-db");
            complete.spec = json!({"parallelism": 2});
            complete.status = json!({"succeeded": 2});
            assert!(workload_ready(&complete));

            let mut running = Object::new("Job", "init-db");
            running.spec = json!({"parallelism": 2});
            running.status = json!({"succeeded": 1});
            assert!(!workload_ready(&running));
        }

        #[test]
        fn test_scaled_to_zero_workload_is_ready() {
            let mut live = Object::new("StatefulSet", "db-server-default");
            live.spec = json!({"replicas": 0});
            live.status = json!({});
            assert!(workload_ready(&live));
        }
    }

    mod object_reconciler_tests {
        use super::*;

        fn credentials_builder(password: &str) -> impl Fn(&ReconcileContext) -> Result<Object> {
            let password = password.to_string();
            move |_ctx: &ReconcileContext| {
                let mut object = Object::new("Secret", "db-credentials");
                object.metadata.namespace = Some("prod".to_string());
                object.spec = json!({"data": {"password": password}});
                Ok(object)
            }
        }

        #[test]
        fn test_create_only_leaves_existing_artifact_alone() {
            let engine = converger();
            let mut unit =
                ObjectReconciler::create_only(engine.clone(), None, credentials_builder("first"));
            assert_eq!(
                unit.reconcile(&ReconcileContext::default()).unwrap(),
                Outcome::Requeue
            );

            let mut regenerated =
                ObjectReconciler::create_only(engine.clone(), None, credentials_builder("second"));
            assert_eq!(
                regenerated.reconcile(&ReconcileContext::default()).unwrap(),
                Outcome::Settled
            );

            let info = engine.registry().resolve("Secret").unwrap();
            let mut probe = Object::new("Secret", "db-credentials");
            probe.metadata.namespace = Some("prod".to_string());
            let stored = engine.store().get(&probe.reference(&info.types)).unwrap();
            assert_eq!(stored.spec["data"]["password"], "first");
        }

        #[test]
        fn test_artifact_is_ready_once_converged() {
            let engine = converger();
            let mut unit = ObjectReconciler::new(engine, None, credentials_builder("pw"));
            unit.reconcile(&ReconcileContext::default()).unwrap();
            assert!(unit.ready(&ReconcileContext::default()).unwrap());
        }
    }
}

//! External store abstraction and in-memory implementation.
//!
//! All convergence happens against an [`ObjectStore`]: CRUD by
//! `(group, version, kind, namespace, name)` with resource-version optimistic
//! concurrency and a distinguishable not-found error. Production controllers
//! implement the trait over the real platform API client; [`MemoryStore`]
//! provides the same contract in memory for tests and dry runs.
//!
//! All operations are synchronous and blocking; no internal timeout is
//! enforced. Callers supply external cancellation/deadlines, and conflicts
//! surface as ordinary errors for the external scheduler to retry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};

/// CRUD contract against the orchestration platform's API.
///
/// Implementations use interior mutability so one shared handle can back all
/// reconcilers of a unit tree; methods therefore take `&self`.
pub trait ObjectStore {
    /// Fetch the live object for a key.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such object exists (the converge
    /// engine consumes this to take the create path) and `Error::Fetch` for
    /// any other failure.
    fn get(&self, key: &ObjectRef) -> Result<Object>;

    /// Create a new object. The store assigns uid and resource version.
    ///
    /// # Errors
    ///
    /// Returns `Error::Fetch` if an object already exists under the key.
    fn create(&self, key: &ObjectRef, object: Object) -> Result<Object>;

    /// Update an existing object.
    ///
    /// If the incoming object carries a resource version, it must match the
    /// live one; the store bumps the version on success.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the object does not exist and
    /// `Error::Conflict` on a resource-version mismatch.
    fn update(&self, key: &ObjectRef, object: Object) -> Result<Object>;

    /// Delete an object, returning it if it existed.
    fn delete(&self, key: &ObjectRef) -> Result<Option<Object>>;

    /// List the keys of all stored objects.
    fn list_refs(&self) -> Result<Vec<ObjectRef>>;
}

#[derive(Debug, Default)]
struct StoreInner {
    objects: HashMap<ObjectRef, Object>,
    /// Monotonic counter backing resource versions, shared across all keys.
    version_counter: u64,
    uid_counter: u64,
}

/// In-memory object store with optimistic concurrency.
///
/// Clone-shareable: clones share the same underlying map, so every
/// reconciler in a unit tree can hold its own handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>> {
        self.inner.lock().map_err(|_| Error::LockPoisoned {
            context: "memory object store".to_string(),
        })
    }

    /// Number of stored objects.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.objects.len())
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.objects.is_empty())
    }

    /// Remove all objects.
    pub fn clear(&self) -> Result<()> {
        self.lock()?.objects.clear();
        Ok(())
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, key: &ObjectRef) -> Result<Object> {
        let inner = self.lock()?;
        inner
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                object: key.to_string(),
            })
    }

    fn create(&self, key: &ObjectRef, mut object: Object) -> Result<Object> {
        let mut inner = self.lock()?;
        if inner.objects.contains_key(key) {
            return Err(Error::Fetch {
                object: key.to_string(),
                message: "object already exists".to_string(),
            });
        }

        inner.version_counter += 1;
        inner.uid_counter += 1;
        object.metadata.resource_version = Some(inner.version_counter.to_string());
        object.metadata.uid = Some(format!("uid-{}", inner.uid_counter));

        inner.objects.insert(key.clone(), object.clone());
        Ok(object)
    }

    fn update(&self, key: &ObjectRef, mut object: Object) -> Result<Object> {
        let mut inner = self.lock()?;
        let live = inner.objects.get(key).ok_or_else(|| Error::NotFound {
            object: key.to_string(),
        })?;

        let live_version = live.metadata.resource_version.clone().unwrap_or_default();
        if let Some(expected) = &object.metadata.resource_version {
            if *expected != live_version {
                return Err(Error::Conflict {
                    object: key.to_string(),
                    expected: expected.clone(),
                    actual: live_version,
                });
            }
        }

        // uid survives the object's whole lifetime regardless of what the
        // caller sent.
        object.metadata.uid = live.metadata.uid.clone();

        inner.version_counter += 1;
        object.metadata.resource_version = Some(inner.version_counter.to_string());
        inner.objects.insert(key.clone(), object.clone());
        Ok(object)
    }

    fn delete(&self, key: &ObjectRef) -> Result<Option<Object>> {
        Ok(self.lock()?.objects.remove(key))
    }

    fn list_refs(&self) -> Result<Vec<ObjectRef>> {
        Ok(self.lock()?.objects.keys().cloned().collect())
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::backend::Backend;
use crate::errors::{Error, Result};
use crate::policy::{Permissions, Rule};

pub type SharedBackend<R> = Arc<dyn Backend<R>>;

/// Named back-ends owned by an `Authorizer`.
///
/// The registry is shared with every gate the authorizer hands out, so
/// back-ends registered after a gate was built are visible when it runs.
pub struct Registry<R> {
    backends: RwLock<BTreeMap<String, SharedBackend<R>>>,
}

impl<R> Registry<R> {
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers `backend` under its own name.
    pub fn use_backend(&self, backend: SharedBackend<R>) -> Result<()> {
        let name = match backend.name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(Error::MissingBackendName),
        };
        self.insert(name, backend);
        Ok(())
    }

    /// Registers `backend` under `name`, ignoring the name it reports itself.
    pub fn use_backend_as(&self, name: &str, backend: SharedBackend<R>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::MissingBackendName);
        }
        self.insert(name.to_string(), backend);
        Ok(())
    }

    pub(crate) fn insert(&self, name: String, backend: SharedBackend<R>) {
        let mut backends = self
            .backends
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        // an instance lives under exactly one name; the latest registration wins
        backends.retain(|_, existing| !same_instance(existing, &backend));
        debug!(backend = %name, "registered authorization back-end");
        backends.insert(name, backend);
    }

    /// Removes the back-end registered as `name`, if any.
    pub fn unuse(&self, name: &str) -> Option<SharedBackend<R>> {
        let removed = self
            .backends
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        if removed.is_some() {
            debug!(backend = %name, "unregistered authorization back-end");
        }
        removed
    }

    pub fn backend_at(&self, name: &str) -> Option<SharedBackend<R>> {
        self.backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_policy(&self, name: &str, action: &str, rule: Rule<R>) -> Result<()> {
        if action.is_empty() {
            return Err(Error::MissingAction);
        }
        let backend = self
            .backend_at(name)
            .ok_or_else(|| Error::UnknownBackend(name.to_string()))?;
        backend.set_policy(action, rule)?;
        debug!(backend = %name, action, "policy set");
        Ok(())
    }

    pub fn unset_policy(&self, name: &str, action: &str) -> Result<()> {
        if action.is_empty() {
            return Err(Error::MissingAction);
        }
        let backend = self
            .backend_at(name)
            .ok_or_else(|| Error::UnknownBackend(name.to_string()))?;
        backend.unset_policy(action)?;
        debug!(backend = %name, action, "policy unset");
        Ok(())
    }

    /// Merges the permissions of every registered back-end.
    ///
    /// Back-ends are visited in ascending name order, so when two of them
    /// define the same action the one with the greater name wins. The first
    /// failing back-end aborts the whole merge. Policies changed while the
    /// merge runs may or may not be reflected.
    pub fn serialize(&self, request: &R) -> Result<Permissions> {
        let snapshot: Vec<(String, SharedBackend<R>)> = self
            .backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, backend)| (name.clone(), Arc::clone(backend)))
            .collect();

        let mut permissions = Permissions::new();
        for (name, backend) in snapshot {
            let serialized = backend.serialize_all(request).map_err(|e| {
                debug!(backend = %name, error = %e, "back-end failed to serialize policies");
                e
            })?;
            permissions.merge(serialized);
        }
        Ok(permissions)
    }
}

impl<R> fmt::Debug for Registry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("backends", &self.names())
            .finish()
    }
}

impl<R> Default for Registry<R> {
    fn default() -> Self {
        Self::new()
    }
}

fn same_instance<R>(a: &SharedBackend<R>, b: &SharedBackend<R>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}

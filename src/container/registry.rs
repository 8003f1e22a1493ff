//! Session-scoped object registry
//!
//! Maps object references to live handles for one open container session.
//! Each target is decoded at most once while it stays unchanged; every later
//! lookup returns a clone of the same `Arc`. Closing the session clears the
//! map, and lookups through any clone of the registry fail with
//! `ContainerClosed` from then on.

use crate::container::node::Group;
use crate::reference::ObjectReference;
use crate::timeseries::{Handle, TimeSeries};
use crate::types::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
struct RegistryState {
    /// Where each identified object lives in the session tree
    paths: HashMap<ObjectReference, String>,
    handles: HashMap<ObjectReference, Handle>,
    loads: u64,
    closed: bool,
}

/// Shared ObjectReference → Handle map of a container session
///
/// Only paths are indexed up front. Targets are decoded from the session's
/// tree on first use, so the registry never holds a second copy of the data.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl ObjectRegistry {
    /// Create an empty, open registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record where a persisted object lives
    ///
    /// Re-registering a target drops its cached handle, so the next lookup
    /// decodes the current contents.
    pub fn register(&self, target: ObjectReference, path: &str) {
        let mut state = self.state.write();
        if state.closed {
            return;
        }
        if state.handles.remove(&target).is_some() {
            log::debug!("object {} changed, dropping its cached handle", target);
        }
        state.paths.insert(target, path.to_string());
    }

    /// Resolve a target against the session tree, decoding it on first use
    ///
    /// # Arguments
    /// * `target` - Identity to look up
    /// * `root` - Root group of the session the target was registered from
    pub fn resolve(&self, target: &ObjectReference, root: &Group) -> StoreResult<Handle> {
        {
            let state = self.state.read();
            if state.closed {
                return Err(StoreError::ContainerClosed);
            }
            if let Some(handle) = state.handles.get(target) {
                return Ok(Arc::clone(handle));
            }
        }

        let mut state = self.state.write();
        if state.closed {
            return Err(StoreError::ContainerClosed);
        }
        // another reader may have loaded it while we waited for the lock
        if let Some(handle) = state.handles.get(target) {
            return Ok(Arc::clone(handle));
        }
        let path = state
            .paths
            .get(target)
            .ok_or_else(|| StoreError::UnresolvedReference(target.clone()))?;
        let group = root
            .find(path)
            .ok_or_else(|| StoreError::UnresolvedReference(target.clone()))?;
        let name = path.rsplit('/').next().unwrap_or_default();
        let handle = Arc::new(TimeSeries::from_group(name, group)?);
        log::debug!("loaded object {} from {}", target, path);

        state.handles.insert(target.clone(), Arc::clone(&handle));
        state.loads += 1;
        Ok(handle)
    }

    /// Path of a registered object
    pub fn path_of(&self, target: &ObjectReference) -> Option<String> {
        self.state.read().paths.get(target).cloned()
    }

    /// Number of registered objects
    pub fn len(&self) -> usize {
        self.state.read().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of targets decoded so far
    pub fn load_count(&self) -> u64 {
        self.state.read().loads
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// Drop every path and handle; later lookups fail with `ContainerClosed`
    pub fn close(&self) {
        let mut state = self.state.write();
        state.paths.clear();
        state.handles.clear();
        state.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerIo, Dataset, MemoryContainer};

    fn container_with_series() -> (MemoryContainer, ObjectReference) {
        let ts = TimeSeries::with_rate("a", "flubs", vec![1.0, 2.0, 3.0], 0.0, 1.0).unwrap();
        let mut container = MemoryContainer::new();
        ts.write(&mut container, "/acquisition/a").unwrap();
        (container, ts.object_id().clone())
    }

    #[test]
    fn test_resolve_loads_once() {
        let (container, id) = container_with_series();
        let registry = container.registry();

        let first = registry.resolve(&id, container.root()).unwrap();
        let second = registry.resolve(&id, container.root()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.load_count(), 1);
        assert_eq!(first.name(), "a");
        assert_eq!(first.object_id(), &id);
    }

    #[test]
    fn test_resolve_unknown_reference() {
        let (container, _) = container_with_series();
        let missing = ObjectReference::generate();
        assert!(matches!(
            container.registry().resolve(&missing, container.root()),
            Err(StoreError::UnresolvedReference(r)) if r == missing
        ));
    }

    #[test]
    fn test_rewritten_object_is_decoded_again() {
        let (mut container, id) = container_with_series();
        let before = container.resolve_object_reference(&id).unwrap();
        assert_eq!(before.data(), &[1.0, 2.0, 3.0]);

        container
            .write_dataset("/acquisition/a/data", Dataset::from_floats(&[4.0, 5.0]))
            .unwrap();
        let after = container.resolve_object_reference(&id).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.data(), &[4.0, 5.0]);
        assert_eq!(container.registry().load_count(), 2);
    }

    #[test]
    fn test_closed_registry_rejects_lookups() {
        let (container, id) = container_with_series();
        let registry = container.registry();
        let shared = registry.clone();
        registry.resolve(&id, container.root()).unwrap();

        registry.close();
        assert!(shared.is_closed());
        assert!(matches!(
            shared.resolve(&id, container.root()),
            Err(StoreError::ContainerClosed)
        ));
        assert!(shared.is_empty());
    }
}

//! Read-only views over an informer cache.

use std::sync::Arc;

use kube::runtime::reflector::{ObjectRef, Store};

use crate::lib::object::CraneObject;
use crate::{CraneError, Result, Selector};

fn labels_match<K: CraneObject>(selector: &Selector, obj: &K) -> bool {
    match obj.meta().labels.as_ref() {
        Some(labels) => selector.matches(labels),
        None => selector.matches(&Default::default()),
    }
}

fn sorted<K: CraneObject>(mut objects: Vec<Arc<K>>) -> Vec<Arc<K>> {
    objects.sort_by(|a, b| {
        (a.meta().namespace.as_deref(), a.meta().name.as_deref())
            .cmp(&(b.meta().namespace.as_deref(), b.meta().name.as_deref()))
    });
    objects
}

/// Cache reads for one kind across all namespaces
pub struct Lister<K: CraneObject> {
    store: Store<K>,
}

impl<K: CraneObject> Clone for Lister<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<K: CraneObject> Lister<K> {
    pub fn new(store: Store<K>) -> Self {
        Self { store }
    }

    /// Cached objects whose labels match, ordered by namespace and name
    pub fn list(&self, selector: &Selector) -> Vec<Arc<K>> {
        sorted(
            self.store
                .state()
                .into_iter()
                .filter(|obj| labels_match(selector, obj.as_ref()))
                .collect(),
        )
    }

    /// Look up a cluster scoped object
    pub fn get(&self, name: &str) -> Result<Arc<K>> {
        self.store
            .get(&ObjectRef::new(name))
            .ok_or_else(|| CraneError::not_found(K::resource_name(), name))
    }

    pub fn namespace(&self, namespace: &str) -> NamespaceLister<K> {
        NamespaceLister {
            store: self.store.clone(),
            namespace: namespace.to_string(),
        }
    }
}

/// Cache reads for one kind within one namespace
pub struct NamespaceLister<K: CraneObject> {
    store: Store<K>,
    namespace: String,
}

impl<K: CraneObject> NamespaceLister<K> {
    pub fn list(&self, selector: &Selector) -> Vec<Arc<K>> {
        sorted(
            self.store
                .state()
                .into_iter()
                .filter(|obj| obj.meta().namespace.as_deref() == Some(self.namespace.as_str()))
                .filter(|obj| labels_match(selector, obj.as_ref()))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Result<Arc<K>> {
        self.store
            .get(&ObjectRef::new(name).within(&self.namespace))
            .ok_or_else(|| CraneError::not_found(K::resource_name(), name))
    }
}

//! In-memory object trackers standing in for the API server in tests.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ListMeta;
use log::{debug, trace};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::lib::client::{ListOptions, Patch, ResourceClient, WatchEvent, WatchStream};
use crate::lib::object::{CraneObject, ResourceList};
use crate::{CraneError, KubernetesError, Result, Selector};

/// Events buffered per watcher before it starts lagging
pub(crate) const WATCH_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

struct TrackerState<K> {
    objects: RwLock<BTreeMap<ObjectKey, K>>,
    resource_version: AtomicU64,
    events: broadcast::Sender<WatchEvent<K>>,
}

/// Store of one kind's objects with server-like write semantics
pub struct ObjectTracker<K: CraneObject> {
    state: Arc<TrackerState<K>>,
}

impl<K: CraneObject> Clone for ObjectTracker<K> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<K: CraneObject> Default for ObjectTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: CraneObject> ObjectTracker<K> {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(TrackerState {
                objects: RwLock::new(BTreeMap::new()),
                resource_version: AtomicU64::new(0),
                events,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ObjectKey, K>> {
        self.state.objects.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ObjectKey, K>> {
        self.state.objects.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_version(&self) -> String {
        (self.state.resource_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn current_version(&self) -> String {
        self.state.resource_version.load(Ordering::SeqCst).to_string()
    }

    fn emit(&self, event: WatchEvent<K>) {
        trace!("{} {}", K::resource_name(), event);
        // No subscribers is not an error
        let _ = self.state.events.send(event);
    }

    fn key(namespace: Option<&str>, name: &str) -> ObjectKey {
        ObjectKey {
            namespace: if K::NAMESPACED {
                namespace.map(str::to_string)
            } else {
                None
            },
            name: name.to_string(),
        }
    }

    fn object_name(obj: &K) -> Result<String> {
        obj.meta()
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| CraneError::Invalid(format!("{}: metadata.name is required", K::resource_name())))
    }

    /// Namespace an object is stored under when written through a client
    /// scoped to `namespace`
    fn object_namespace(namespace: Option<&str>, obj: &K) -> Result<Option<String>> {
        if !K::NAMESPACED {
            return Ok(None);
        }
        let own = obj.meta().namespace.as_deref().filter(|ns| !ns.is_empty());
        match (namespace, own) {
            (Some(request), Some(own)) if request != own => Err(CraneError::Invalid(format!(
                "request namespace {request:?} does not match object namespace {own:?}"
            ))),
            (Some(ns), _) | (None, Some(ns)) => Ok(Some(ns.to_string())),
            (None, None) => Err(CraneError::Invalid(format!(
                "{} must be created in a namespace",
                K::kind_name()
            ))),
        }
    }

    fn in_scope(namespace: Option<&str>, key: &ObjectKey) -> bool {
        match namespace {
            Some(ns) if K::NAMESPACED => key.namespace.as_deref() == Some(ns),
            _ => true,
        }
    }

    /// Insert or replace an object as-is, without conflict checks
    pub fn add(&self, obj: K) -> Result<K> {
        let name = Self::object_name(&obj)?;
        let key = Self::key(obj.meta().namespace.as_deref(), &name);

        let mut objects = self.write();
        let mut stored = obj;
        stored.meta_mut().resource_version = Some(self.next_version());
        let existed = objects.insert(key, stored.clone()).is_some();
        self.emit(if existed {
            WatchEvent::Modified(stored.clone())
        } else {
            WatchEvent::Added(stored.clone())
        });
        Ok(stored)
    }

    pub fn get(&self, namespace: Option<&str>, name: &str) -> Result<K> {
        self.read()
            .get(&Self::key(namespace, name))
            .cloned()
            .ok_or_else(|| CraneError::not_found(K::resource_name(), name))
    }

    pub fn list(&self, namespace: Option<&str>, opts: &ListOptions) -> Result<ResourceList<K>> {
        let filter = Filter::new(opts)?;
        let items = self
            .read()
            .iter()
            .filter(|(key, obj)| Self::in_scope(namespace, key) && filter.matches(*obj))
            .map(|(_, obj)| obj.clone())
            .collect();

        let metadata = ListMeta {
            resource_version: Some(self.current_version()),
            ..Default::default()
        };
        Ok(ResourceList::new(metadata, items))
    }

    pub fn create(&self, namespace: Option<&str>, obj: &K) -> Result<K> {
        let name = Self::object_name(obj)?;
        let object_namespace = Self::object_namespace(namespace, obj)?;
        let key = Self::key(object_namespace.as_deref(), &name);

        let mut objects = self.write();
        if objects.contains_key(&key) {
            return Err(CraneError::already_exists(K::resource_name(), name));
        }

        let mut stored = obj.clone();
        stored.meta_mut().namespace = object_namespace;
        stored.meta_mut().resource_version = Some(self.next_version());
        objects.insert(key, stored.clone());
        self.emit(WatchEvent::Added(stored.clone()));
        debug!("Created {} {}", K::resource_name(), name);
        Ok(stored)
    }

    pub fn update(&self, namespace: Option<&str>, obj: &K) -> Result<K> {
        self.replace(namespace, obj, |_, incoming| Ok(incoming.clone()))
    }

    /// Replace only the status of the stored object
    pub fn update_status(&self, namespace: Option<&str>, obj: &K) -> Result<K> {
        self.replace(namespace, obj, |current, incoming| {
            let mut merged = serde_json::to_value(current)?;
            let status = serde_json::to_value(incoming)?.get("status").cloned();
            if let Value::Object(fields) = &mut merged {
                match status {
                    Some(status) => fields.insert("status".into(), status),
                    None => fields.remove("status"),
                };
            }
            Ok(serde_json::from_value(merged)?)
        })
    }

    fn replace<F>(&self, namespace: Option<&str>, obj: &K, build: F) -> Result<K>
    where
        F: FnOnce(&K, &K) -> Result<K>,
    {
        let resource = K::resource_name();
        let name = Self::object_name(obj)?;
        let object_namespace = Self::object_namespace(namespace, obj)?;
        let key = Self::key(object_namespace.as_deref(), &name);

        let mut objects = self.write();
        let current = objects
            .get(&key)
            .ok_or_else(|| CraneError::not_found(&resource, &name))?;

        Self::check_version(current, obj.meta().resource_version.as_deref())?;

        let mut stored = build(current, obj)?;
        stored.meta_mut().name = Some(name);
        stored.meta_mut().namespace = object_namespace;
        stored.meta_mut().resource_version = Some(self.next_version());
        objects.insert(key, stored.clone());
        self.emit(WatchEvent::Modified(stored.clone()));
        Ok(stored)
    }

    /// A non-empty requested resource version must match the stored one
    fn check_version(current: &K, requested: Option<&str>) -> Result<()> {
        let stale = requested.is_some_and(|v| !v.is_empty() && Some(v) != current.meta().resource_version.as_deref());
        if stale {
            return Err(CraneError::Conflict(format!(
                "Operation cannot be fulfilled on {} \"{}\": the object has been modified",
                K::resource_name(),
                current.meta().name.as_deref().unwrap_or_default()
            )));
        }
        Ok(())
    }

    pub fn delete(&self, namespace: Option<&str>, name: &str) -> Result<()> {
        let mut objects = self.write();
        let removed = objects
            .remove(&Self::key(namespace, name))
            .ok_or_else(|| CraneError::not_found(K::resource_name(), name))?;
        self.emit(WatchEvent::Deleted(removed));
        debug!("Deleted {} {}", K::resource_name(), name);
        Ok(())
    }

    pub fn delete_collection(&self, namespace: Option<&str>, opts: &ListOptions) -> Result<usize> {
        let filter = Filter::new(opts)?;
        let mut objects = self.write();
        let doomed: Vec<ObjectKey> = objects
            .iter()
            .filter(|(key, obj)| Self::in_scope(namespace, key) && filter.matches(*obj))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            if let Some(removed) = objects.remove(key) {
                self.emit(WatchEvent::Deleted(removed));
            }
        }
        Ok(doomed.len())
    }

    pub fn patch(&self, namespace: Option<&str>, name: &str, patch: &Patch) -> Result<K> {
        let body = match patch {
            Patch::Merge(body) | Patch::Strategic(body) => body,
            other => {
                return Err(CraneError::Invalid(format!(
                    "{} patches are not supported",
                    other.type_name()
                )));
            }
        };

        let key = Self::key(namespace, name);
        let mut objects = self.write();
        let current = objects
            .get(&key)
            .ok_or_else(|| CraneError::not_found(K::resource_name(), name))?;
        Self::check_version(
            current,
            body.pointer("/metadata/resourceVersion").and_then(|v| v.as_str()),
        )?;

        let mut value = serde_json::to_value(current)?;
        json_patch::merge(&mut value, body);
        let mut stored: K = serde_json::from_value(value)?;
        stored.meta_mut().name = Some(key.name.clone());
        stored.meta_mut().namespace = key.namespace.clone();
        stored.meta_mut().resource_version = Some(self.next_version());
        objects.insert(key, stored.clone());
        self.emit(WatchEvent::Modified(stored.clone()));
        Ok(stored)
    }

    /// Events for every later write that falls in scope and passes the
    /// selectors in `opts`
    pub fn watch(&self, namespace: Option<&str>, opts: &ListOptions) -> Result<WatchStream<K>> {
        let filter = Filter::new(opts)?;
        let namespace = namespace.map(str::to_string);
        let receiver = self.state.events.subscribe();

        Ok(BroadcastStream::new(receiver)
            .filter_map(move |item| {
                let keep = match item {
                    Ok(event) => {
                        let wanted = match event.object() {
                            Some(obj) => {
                                let key = Self::key(obj.meta().namespace.as_deref(), "");
                                Self::in_scope(namespace.as_deref(), &key) && filter.matches(obj)
                            }
                            None => true,
                        };
                        wanted.then_some(Ok(event))
                    }
                    Err(BroadcastStreamRecvError::Lagged(missed)) => Some(Err(
                        KubernetesError::WatchFailed(format!("watcher fell behind by {missed} events")).into(),
                    )),
                };
                async move { keep }
            })
            .boxed())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Label and field selectors of a request, parsed once
struct Filter {
    labels: Selector,
    fields: Vec<(String, bool, String)>,
}

impl Filter {
    fn new(opts: &ListOptions) -> Result<Self> {
        let labels = Selector::parse_optional(opts.label_selector.as_deref())?;
        let fields = opts
            .field_selector
            .as_deref()
            .map(parse_field_selector)
            .transpose()?
            .unwrap_or_default();
        Ok(Self { labels, fields })
    }

    fn matches<K: CraneObject>(&self, obj: &K) -> bool {
        let meta = obj.meta();
        let empty = BTreeMap::new();
        if !self.labels.matches(meta.labels.as_ref().unwrap_or(&empty)) {
            return false;
        }
        self.fields.iter().all(|(field, equal, value)| {
            let actual = match field.as_str() {
                "metadata.name" => meta.name.as_deref(),
                _ => meta.namespace.as_deref(),
            }
            .unwrap_or("");
            (actual == value) == *equal
        })
    }
}

/// `metadata.name` and `metadata.namespace` with `=`, `==` and `!=`
fn parse_field_selector(selector: &str) -> Result<Vec<(String, bool, String)>> {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| {
            let (field, equal, value) = if let Some((f, v)) = term.split_once("!=") {
                (f, false, v)
            } else if let Some((f, v)) = term.split_once("==") {
                (f, true, v)
            } else if let Some((f, v)) = term.split_once('=') {
                (f, true, v)
            } else {
                return Err(CraneError::Invalid(format!("invalid field selector {term:?}")));
            };
            let field = field.trim();
            if field != "metadata.name" && field != "metadata.namespace" {
                return Err(CraneError::Invalid(format!("field {field:?} is not supported")));
            }
            Ok((field.to_string(), equal, value.trim().to_string()))
        })
        .collect()
}

/// One tracker per kind, shared by every client built from it
#[derive(Clone, Default)]
pub struct FakeTrackers {
    trackers: Arc<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl FakeTrackers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker<K: CraneObject>(&self) -> ObjectTracker<K> {
        let mut trackers = self.trackers.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = trackers
            .entry(TypeId::of::<K>())
            .or_insert_with(|| Box::new(ObjectTracker::<K>::new()) as Box<dyn Any + Send + Sync>);
        if let Some(tracker) = entry.downcast_ref::<ObjectTracker<K>>() {
            return tracker.clone();
        }
        let tracker = ObjectTracker::<K>::new();
        *entry = Box::new(tracker.clone());
        tracker
    }

    /// Seed objects of one kind
    pub fn with_objects<K: CraneObject>(self, objects: impl IntoIterator<Item = K>) -> Result<Self> {
        let tracker = self.tracker::<K>();
        for obj in objects {
            tracker.add(obj)?;
        }
        Ok(self)
    }
}

/// `ResourceClient` over an `ObjectTracker`
pub struct FakeClient<K: CraneObject> {
    tracker: ObjectTracker<K>,
    namespace: Option<String>,
}

impl<K: CraneObject> FakeClient<K> {
    pub fn new(tracker: ObjectTracker<K>, namespace: Option<&str>) -> Self {
        Self {
            tracker,
            namespace: namespace.map(str::to_string),
        }
    }

    fn ns(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

#[async_trait]
impl<K: CraneObject> ResourceClient<K> for FakeClient<K> {
    async fn get(&self, name: &str) -> Result<K> {
        self.tracker.get(self.ns(), name)
    }

    async fn list(&self, opts: &ListOptions) -> Result<ResourceList<K>> {
        self.tracker.list(self.ns(), opts)
    }

    async fn watch(&self, opts: &ListOptions) -> Result<WatchStream<K>> {
        self.tracker.watch(self.ns(), opts)
    }

    async fn create(&self, obj: &K) -> Result<K> {
        self.tracker.create(self.ns(), obj)
    }

    async fn update(&self, obj: &K) -> Result<K> {
        self.tracker.update(self.ns(), obj)
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        self.tracker.update_status(self.ns(), obj)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.tracker.delete(self.ns(), name)
    }

    async fn delete_collection(&self, opts: &ListOptions) -> Result<()> {
        self.tracker.delete_collection(self.ns(), opts).map(|_| ())
    }

    async fn patch(&self, name: &str, patch: &Patch) -> Result<K> {
        self.tracker.patch(self.ns(), name, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::apis::autoscaling::{
        EffectiveHorizontalPodAutoscaler, EffectiveHorizontalPodAutoscalerSpec,
        EffectiveHorizontalPodAutoscalerStatus,
    };
    use crate::lib::apis::co2e::{CloudCarbonFootprint, CloudCarbonFootprintSpec};
    use crate::lib::client::Clientset;
    use serde_json::json;

    fn ehpa(name: &str, labels: &[(&str, &str)]) -> EffectiveHorizontalPodAutoscaler {
        let mut obj = EffectiveHorizontalPodAutoscaler::new(
            name,
            EffectiveHorizontalPodAutoscalerSpec {
                max_replicas: 10,
                ..Default::default()
            },
        );
        obj.metadata.labels = Some(
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        obj
    }

    #[tokio::test]
    async fn create_get_and_duplicate() {
        let clientset = Clientset::fake(FakeTrackers::new());
        let client = clientset.autoscaling().effective_horizontal_pod_autoscalers("default");

        let created = client.create(&ehpa("web", &[])).await.unwrap();
        assert_eq!(created.metadata.namespace.as_deref(), Some("default"));
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));

        let fetched = client.get("web").await.unwrap();
        assert_eq!(fetched, created);

        let err = client.create(&ehpa("web", &[])).await.unwrap_err();
        assert!(matches!(err, CraneError::AlreadyExists { .. }));

        let other_ns = clientset.autoscaling().effective_horizontal_pod_autoscalers("prod");
        let err = other_ns.get("web").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "effectivehorizontalpodautoscalers \"web\" not found");
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let clientset = Clientset::fake(FakeTrackers::new());
        let client = clientset.autoscaling().effective_horizontal_pod_autoscalers("default");
        let first = client.create(&ehpa("web", &[])).await.unwrap();

        let mut fresh = first.clone();
        fresh.spec.max_replicas = 20;
        let updated = client.update(&fresh).await.unwrap();
        assert_eq!(updated.spec.max_replicas, 20);
        assert_ne!(updated.metadata.resource_version, first.metadata.resource_version);

        let mut stale = first;
        stale.spec.max_replicas = 30;
        assert!(matches!(client.update(&stale).await.unwrap_err(), CraneError::Conflict(_)));

        let missing = ehpa("api", &[]);
        assert!(client.update(&missing).await.unwrap_err().is_not_found());
        assert!(client.delete("api").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_status_leaves_spec_alone() {
        let clientset = Clientset::fake(FakeTrackers::new());
        let client = clientset.autoscaling().effective_horizontal_pod_autoscalers("default");
        let created = client.create(&ehpa("web", &[])).await.unwrap();

        let mut with_status = created.clone();
        with_status.spec.max_replicas = 99;
        with_status.status = Some(EffectiveHorizontalPodAutoscalerStatus {
            expect_replicas: Some(4),
            ..Default::default()
        });
        let stored = client.update_status(&with_status).await.unwrap();
        assert_eq!(stored.spec.max_replicas, 10);
        assert_eq!(stored.status.and_then(|s| s.expect_replicas), Some(4));
    }

    #[tokio::test]
    async fn label_selector_filters_list_and_delete_collection() {
        let clientset = Clientset::fake(FakeTrackers::new());
        let client = clientset.autoscaling().effective_horizontal_pod_autoscalers("default");
        client.create(&ehpa("a", &[("app", "web")])).await.unwrap();
        client.create(&ehpa("b", &[("app", "api")])).await.unwrap();
        client.create(&ehpa("c", &[])).await.unwrap();

        let web = client.list(&ListOptions::default().labels("app=web")).await.unwrap();
        assert_eq!(web.items.iter().map(|o| o.metadata.name.clone().unwrap()).collect::<Vec<_>>(), ["a"]);
        assert_eq!(web.kind, "EffectiveHorizontalPodAutoscalerList");

        let labelled = client.list(&ListOptions::default().labels("app")).await.unwrap();
        assert_eq!(labelled.len(), 2);

        let by_name = client.list(&ListOptions::default().fields("metadata.name=c")).await.unwrap();
        assert_eq!(by_name.len(), 1);

        client
            .delete_collection(&ListOptions::default().labels("app in (web,api)"))
            .await
            .unwrap();
        let rest = client.list(&ListOptions::default()).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest.items[0].metadata.name.as_deref(), Some("c"));

        assert!(client.list(&ListOptions::default().labels("app in web")).await.is_err());
    }

    #[tokio::test]
    async fn merge_patch_keeps_identity() {
        let trackers = FakeTrackers::new();
        let clientset = Clientset::fake(trackers.clone());
        let client = clientset.co2e().cloud_carbon_footprints();
        client
            .create(&CloudCarbonFootprint::new(
                "sh",
                CloudCarbonFootprintSpec {
                    provider: "Manual".into(),
                    region: "ap-shanghai".into(),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        let patched = client
            .patch(
                "sh",
                &Patch::Merge(json!({"metadata": {"name": "other"}, "spec": {"region": null, "pue": "1.4"}})),
            )
            .await
            .unwrap();
        assert_eq!(patched.metadata.name.as_deref(), Some("sh"));
        assert_eq!(patched.spec.region, "");
        assert_eq!(patched.spec.pue, "1.4");
        assert_eq!(trackers.tracker::<CloudCarbonFootprint>().len(), 1);

        let apply = Patch::Apply {
            field_manager: "test".into(),
            body: json!({}),
        };
        assert!(matches!(client.patch("sh", &apply).await.unwrap_err(), CraneError::Invalid(_)));
        assert!(client.patch("nope", &Patch::Merge(json!({}))).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn patch_honours_resource_version() {
        let client = Clientset::fake(FakeTrackers::new()).co2e().cloud_carbon_footprints();
        let created = client
            .create(&CloudCarbonFootprint::new("sh", CloudCarbonFootprintSpec::default()))
            .await
            .unwrap();
        let version = created.metadata.resource_version.clone().unwrap();

        let stale = Patch::Merge(json!({"metadata": {"resourceVersion": "0"}, "spec": {"pue": "1.2"}}));
        assert!(matches!(client.patch("sh", &stale).await.unwrap_err(), CraneError::Conflict(_)));
        assert_eq!(client.get("sh").await.unwrap().spec.pue, "");

        let current = Patch::Merge(json!({"metadata": {"resourceVersion": version}, "spec": {"pue": "1.2"}}));
        let patched = client.patch("sh", &current).await.unwrap();
        assert_eq!(patched.spec.pue, "1.2");
        assert_ne!(patched.metadata.resource_version, Some(version));
    }

    #[tokio::test]
    async fn watch_sees_scoped_writes() {
        let clientset = Clientset::fake(FakeTrackers::new());
        let default = clientset.autoscaling().effective_horizontal_pod_autoscalers("default");
        let prod = clientset.autoscaling().effective_horizontal_pod_autoscalers("prod");

        let mut events = default.watch(&ListOptions::default().labels("app=web")).await.unwrap();
        prod.create(&ehpa("web", &[("app", "web")])).await.unwrap();
        default.create(&ehpa("ignored", &[])).await.unwrap();
        let created = default.create(&ehpa("web", &[("app", "web")])).await.unwrap();
        default.patch("web", &Patch::Merge(json!({"spec": {"maxReplicas": 3}}))).await.unwrap();
        default.delete("web").await.unwrap();

        let first = events.next().await.unwrap().unwrap();
        assert_eq!(first, WatchEvent::Added(created));
        assert!(matches!(events.next().await.unwrap().unwrap(), WatchEvent::Modified(o) if o.spec.max_replicas == 3));
        assert!(matches!(events.next().await.unwrap().unwrap(), WatchEvent::Deleted(_)));
    }

    #[tokio::test]
    async fn cluster_scoped_kinds_ignore_namespace() {
        let tracker = ObjectTracker::<CloudCarbonFootprint>::new();
        let client = FakeClient::new(tracker.clone(), Some("ignored"));
        let created = client
            .create(&CloudCarbonFootprint::new("dc1", CloudCarbonFootprintSpec::default()))
            .await
            .unwrap();
        assert_eq!(created.metadata.namespace, None);
        assert!(tracker.get(None, "dc1").is_ok());

        let unnamed = CloudCarbonFootprint::new("", CloudCarbonFootprintSpec::default());
        assert!(matches!(client.create(&unnamed).await.unwrap_err(), CraneError::Invalid(_)));
    }

    #[tokio::test]
    async fn namespaced_create_needs_matching_namespace() {
        let tracker = ObjectTracker::<EffectiveHorizontalPodAutoscaler>::new();
        let all = FakeClient::new(tracker.clone(), None);
        assert!(matches!(all.create(&ehpa("web", &[])).await.unwrap_err(), CraneError::Invalid(_)));

        let mut placed = ehpa("web", &[]);
        placed.metadata.namespace = Some("prod".into());
        all.create(&placed).await.unwrap();

        let default = FakeClient::new(tracker, Some("default"));
        assert!(matches!(default.create(&placed).await.unwrap_err(), CraneError::Invalid(_)));
        assert_eq!(all.list(&ListOptions::default()).await.unwrap().len(), 1);
    }
}

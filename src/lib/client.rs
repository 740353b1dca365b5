//! Typed clients: one `ResourceClient` per kind, backed either by the API
//! server or by an in-memory tracker, and a `Clientset` grouping them by API
//! group.

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use kube::api::{DeleteParams, ListParams, PatchParams, PostParams, WatchParams};
use kube::core::WatchEvent as KubeWatchEvent;
use kube::{Api, Client};
use log::debug;
use serde_json::{Value, json};

use crate::lib::apis::analysis::{Analytics, ConfigSet, Recommendation, RecommendationRule};
use crate::lib::apis::autoscaling::{EffectiveHorizontalPodAutoscaler, EffectiveVerticalPodAutoscaler};
use crate::lib::apis::co2e::CloudCarbonFootprint;
use crate::lib::apis::ensurance::{
    AvoidanceAction, NodeQOS, NodeQOSEnsurancePolicy, PodQOS, PodQOSEnsurancePolicy,
};
use crate::lib::apis::prediction::{
    ClusterNodePrediction, NodePrediction, PodGroupPrediction, TimeSeriesPrediction,
};
use crate::lib::apis::topology::NodeResourceTopology;
use crate::lib::fake::{FakeClient, FakeTrackers};
use crate::lib::informer::{self, EventStream};
use crate::lib::object::{CraneObject, ResourceList};
use crate::{CraneError, KubernetesError, Result};

/// Options shared by list, watch and delete-collection
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
    /// List: serve from at least this version. Watch: start after it.
    pub resource_version: Option<String>,
    pub timeout_seconds: Option<u32>,
}

impl ListOptions {
    pub fn labels(mut self, selector: &str) -> Self {
        self.label_selector = Some(selector.to_string());
        self
    }

    pub fn fields(mut self, selector: &str) -> Self {
        self.field_selector = Some(selector.to_string());
        self
    }

    pub fn at(mut self, resource_version: &str) -> Self {
        self.resource_version = Some(resource_version.to_string());
        self
    }

    fn list_params(&self) -> ListParams {
        let mut lp = ListParams::default();
        if let Some(labels) = self.label_selector.as_deref() {
            lp = lp.labels(labels);
        }
        if let Some(fields) = self.field_selector.as_deref() {
            lp = lp.fields(fields);
        }
        if let Some(version) = self.resource_version.as_deref() {
            lp = lp.at(version);
        }
        if let Some(timeout) = self.timeout_seconds {
            lp = lp.timeout(timeout);
        }
        lp
    }

    /// Version a watch starts after. "0" lets the server answer from any
    /// cached version instead of from now.
    fn watch_version(&self) -> &str {
        self.resource_version.as_deref().unwrap_or("0")
    }

    fn watch_params(&self) -> WatchParams {
        let mut wp = WatchParams::default();
        if let Some(labels) = self.label_selector.as_deref() {
            wp = wp.labels(labels);
        }
        if let Some(fields) = self.field_selector.as_deref() {
            wp = wp.fields(fields);
        }
        if let Some(timeout) = self.timeout_seconds {
            wp = wp.timeout(timeout);
        }
        wp
    }
}

/// A change observed on a watch
#[derive(Clone, Debug, PartialEq)]
pub enum WatchEvent<K> {
    Added(K),
    Modified(K),
    Deleted(K),
    /// Progress marker carrying only a resource version
    Bookmark(String),
}

impl<K> WatchEvent<K> {
    pub fn object(&self) -> Option<&K> {
        match self {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) | WatchEvent::Deleted(obj) => Some(obj),
            WatchEvent::Bookmark(_) => None,
        }
    }
}

impl<K> fmt::Display for WatchEvent<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchEvent::Added(_) => write!(f, "ADDED"),
            WatchEvent::Modified(_) => write!(f, "MODIFIED"),
            WatchEvent::Deleted(_) => write!(f, "DELETED"),
            WatchEvent::Bookmark(_) => write!(f, "BOOKMARK"),
        }
    }
}

pub type WatchStream<K> = BoxStream<'static, Result<WatchEvent<K>>>;

/// Patch bodies accepted by `ResourceClient::patch`
#[derive(Clone, Debug, PartialEq)]
pub enum Patch {
    /// RFC 7386 JSON merge patch
    Merge(Value),
    /// Kubernetes strategic merge patch
    Strategic(Value),
    /// Server-side apply on behalf of a field manager
    Apply { field_manager: String, body: Value },
}

impl Patch {
    pub fn type_name(&self) -> &'static str {
        match self {
            Patch::Merge(_) => "merge",
            Patch::Strategic(_) => "strategic",
            Patch::Apply { .. } => "apply",
        }
    }
}

/// Typed CRUD and watch for one kind, scoped to a namespace or to the
/// whole cluster
#[async_trait]
pub trait ResourceClient<K: CraneObject>: Send + Sync {
    async fn get(&self, name: &str) -> Result<K>;

    async fn list(&self, opts: &ListOptions) -> Result<ResourceList<K>>;

    /// Changes after `opts.resource_version`. Without one the API server
    /// starts from "0", i.e. any version it has cached, and may replay
    /// existing objects as `Added`; the fake starts from the current state.
    /// Pass the version of a previous list to see only later writes.
    async fn watch(&self, opts: &ListOptions) -> Result<WatchStream<K>>;

    async fn create(&self, obj: &K) -> Result<K>;

    async fn update(&self, obj: &K) -> Result<K>;

    /// Write only the status of `obj`
    async fn update_status(&self, obj: &K) -> Result<K>;

    async fn delete(&self, name: &str) -> Result<()>;

    async fn delete_collection(&self, opts: &ListOptions) -> Result<()>;

    async fn patch(&self, name: &str, patch: &Patch) -> Result<K>;
}

/// `ResourceClient` against a live API server
pub struct ApiClient<K: CraneObject> {
    api: Api<K>,
}

impl<K: CraneObject> ApiClient<K> {
    pub fn new(client: Client, namespace: Option<&str>) -> Self {
        Self {
            api: K::api(client, namespace),
        }
    }

    fn object_name(obj: &K) -> Result<String> {
        obj.meta()
            .name
            .clone()
            .ok_or_else(|| CraneError::Invalid(format!("{} has no name", K::kind_name())))
    }
}

#[async_trait]
impl<K: CraneObject> ResourceClient<K> for ApiClient<K> {
    async fn get(&self, name: &str) -> Result<K> {
        self.api
            .get(name)
            .await
            .map_err(|e| CraneError::from_kube(e, &K::resource_name(), name))
    }

    async fn list(&self, opts: &ListOptions) -> Result<ResourceList<K>> {
        debug!("Listing {} with {:?}", K::resource_name(), opts);
        let list = self
            .api
            .list(&opts.list_params())
            .await
            .map_err(|e| CraneError::from_kube(e, &K::resource_name(), ""))?;
        Ok(ResourceList::new(list.metadata, list.items))
    }

    async fn watch(&self, opts: &ListOptions) -> Result<WatchStream<K>> {
        let stream = self
            .api
            .watch(&opts.watch_params(), opts.watch_version())
            .await
            .map_err(|e| CraneError::from_kube(e, &K::resource_name(), ""))?;

        Ok(stream
            .map_err(|e| CraneError::from(KubernetesError::WatchFailed(e.to_string())))
            .and_then(|event| async move {
                match event {
                    KubeWatchEvent::Added(obj) => Ok(WatchEvent::Added(obj)),
                    KubeWatchEvent::Modified(obj) => Ok(WatchEvent::Modified(obj)),
                    KubeWatchEvent::Deleted(obj) => Ok(WatchEvent::Deleted(obj)),
                    KubeWatchEvent::Bookmark(bookmark) => {
                        Ok(WatchEvent::Bookmark(bookmark.metadata.resource_version))
                    }
                    KubeWatchEvent::Error(status) => {
                        Err(KubernetesError::WatchFailed(status.message.clone()).into())
                    }
                }
            })
            .boxed())
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let name = obj.meta().name.clone().unwrap_or_default();
        self.api
            .create(&PostParams::default(), obj)
            .await
            .map_err(|e| CraneError::from_kube(e, &K::resource_name(), &name))
    }

    async fn update(&self, obj: &K) -> Result<K> {
        let name = Self::object_name(obj)?;
        self.api
            .replace(&name, &PostParams::default(), obj)
            .await
            .map_err(|e| CraneError::from_kube(e, &K::resource_name(), &name))
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        let name = Self::object_name(obj)?;
        let status = serde_json::to_value(obj)?
            .get("status")
            .cloned()
            .unwrap_or(Value::Null);
        let patch = kube::api::Patch::Merge(json!({ "status": status }));
        self.api
            .patch_status(&name, &PatchParams::default(), &patch)
            .await
            .map_err(|e| CraneError::from_kube(e, &K::resource_name(), &name))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.api
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| CraneError::from_kube(e, &K::resource_name(), name))?;
        Ok(())
    }

    async fn delete_collection(&self, opts: &ListOptions) -> Result<()> {
        self.api
            .delete_collection(&DeleteParams::default(), &opts.list_params())
            .await
            .map_err(|e| CraneError::from_kube(e, &K::resource_name(), ""))?;
        Ok(())
    }

    async fn patch(&self, name: &str, patch: &Patch) -> Result<K> {
        let result = match patch {
            Patch::Merge(body) => {
                self.api
                    .patch(name, &PatchParams::default(), &kube::api::Patch::Merge(body))
                    .await
            }
            Patch::Strategic(body) => {
                self.api
                    .patch(name, &PatchParams::default(), &kube::api::Patch::Strategic(body))
                    .await
            }
            Patch::Apply {
                field_manager,
                body,
            } => {
                self.api
                    .patch(name, &PatchParams::apply(field_manager), &kube::api::Patch::Apply(body))
                    .await
            }
        };
        result.map_err(|e| CraneError::from_kube(e, &K::resource_name(), name))
    }
}

#[derive(Clone)]
enum Backend {
    Api(Client),
    Fake(FakeTrackers),
}

/// Typed clients for every Crane API group
#[derive(Clone)]
pub struct Clientset {
    backend: Backend,
}

impl Clientset {
    pub fn new(client: Client) -> Self {
        Self {
            backend: Backend::Api(client),
        }
    }

    /// Clientset over in-memory trackers
    pub fn fake(trackers: FakeTrackers) -> Self {
        Self {
            backend: Backend::Fake(trackers),
        }
    }

    /// Client for any kind; `None` spans all namespaces
    pub fn resource<K: CraneObject>(&self, namespace: Option<&str>) -> Box<dyn ResourceClient<K>> {
        match &self.backend {
            Backend::Api(client) => Box::new(ApiClient::<K>::new(client.clone(), namespace)),
            Backend::Fake(trackers) => Box::new(FakeClient::new(trackers.tracker::<K>(), namespace)),
        }
    }

    /// Watch events feeding an informer for `K`
    pub fn event_source<K: CraneObject>(&self, namespace: Option<&str>, opts: &ListOptions) -> EventStream<K> {
        match &self.backend {
            Backend::Api(client) => informer::watch_api(K::api(client.clone(), namespace), opts),
            Backend::Fake(_) => informer::list_watch(self.resource::<K>(namespace), opts.clone()),
        }
    }

    pub fn analysis(&self) -> AnalysisV1alpha1<'_> {
        AnalysisV1alpha1 { clientset: self }
    }

    pub fn autoscaling(&self) -> AutoscalingV1alpha1<'_> {
        AutoscalingV1alpha1 { clientset: self }
    }

    pub fn ensurance(&self) -> EnsuranceV1alpha1<'_> {
        EnsuranceV1alpha1 { clientset: self }
    }

    pub fn prediction(&self) -> PredictionV1alpha1<'_> {
        PredictionV1alpha1 { clientset: self }
    }

    pub fn topology(&self) -> TopologyV1alpha1<'_> {
        TopologyV1alpha1 { clientset: self }
    }

    pub fn co2e(&self) -> Co2eV1alpha1<'_> {
        Co2eV1alpha1 { clientset: self }
    }
}

pub struct AnalysisV1alpha1<'a> {
    clientset: &'a Clientset,
}

impl AnalysisV1alpha1<'_> {
    pub fn recommendations(&self, namespace: &str) -> Box<dyn ResourceClient<Recommendation>> {
        self.clientset.resource(Some(namespace))
    }

    pub fn analytics(&self, namespace: &str) -> Box<dyn ResourceClient<Analytics>> {
        self.clientset.resource(Some(namespace))
    }

    pub fn config_sets(&self, namespace: &str) -> Box<dyn ResourceClient<ConfigSet>> {
        self.clientset.resource(Some(namespace))
    }

    pub fn recommendation_rules(&self) -> Box<dyn ResourceClient<RecommendationRule>> {
        self.clientset.resource(None)
    }
}

pub struct AutoscalingV1alpha1<'a> {
    clientset: &'a Clientset,
}

impl AutoscalingV1alpha1<'_> {
    pub fn effective_horizontal_pod_autoscalers(
        &self,
        namespace: &str,
    ) -> Box<dyn ResourceClient<EffectiveHorizontalPodAutoscaler>> {
        self.clientset.resource(Some(namespace))
    }

    pub fn effective_vertical_pod_autoscalers(
        &self,
        namespace: &str,
    ) -> Box<dyn ResourceClient<EffectiveVerticalPodAutoscaler>> {
        self.clientset.resource(Some(namespace))
    }
}

pub struct EnsuranceV1alpha1<'a> {
    clientset: &'a Clientset,
}

impl EnsuranceV1alpha1<'_> {
    pub fn pod_qoss(&self) -> Box<dyn ResourceClient<PodQOS>> {
        self.clientset.resource(None)
    }

    pub fn node_qoss(&self) -> Box<dyn ResourceClient<NodeQOS>> {
        self.clientset.resource(None)
    }

    pub fn avoidance_actions(&self) -> Box<dyn ResourceClient<AvoidanceAction>> {
        self.clientset.resource(None)
    }

    pub fn pod_qos_ensurance_policies(
        &self,
        namespace: &str,
    ) -> Box<dyn ResourceClient<PodQOSEnsurancePolicy>> {
        self.clientset.resource(Some(namespace))
    }

    pub fn node_qos_ensurance_policies(
        &self,
        namespace: &str,
    ) -> Box<dyn ResourceClient<NodeQOSEnsurancePolicy>> {
        self.clientset.resource(Some(namespace))
    }
}

pub struct PredictionV1alpha1<'a> {
    clientset: &'a Clientset,
}

impl PredictionV1alpha1<'_> {
    pub fn time_series_predictions(
        &self,
        namespace: &str,
    ) -> Box<dyn ResourceClient<TimeSeriesPrediction>> {
        self.clientset.resource(Some(namespace))
    }

    pub fn pod_group_predictions(&self, namespace: &str) -> Box<dyn ResourceClient<PodGroupPrediction>> {
        self.clientset.resource(Some(namespace))
    }

    pub fn node_predictions(&self) -> Box<dyn ResourceClient<NodePrediction>> {
        self.clientset.resource(None)
    }

    pub fn cluster_node_predictions(
        &self,
        namespace: &str,
    ) -> Box<dyn ResourceClient<ClusterNodePrediction>> {
        self.clientset.resource(Some(namespace))
    }
}

pub struct TopologyV1alpha1<'a> {
    clientset: &'a Clientset,
}

impl TopologyV1alpha1<'_> {
    pub fn node_resource_topologies(&self) -> Box<dyn ResourceClient<NodeResourceTopology>> {
        self.clientset.resource(None)
    }
}

pub struct Co2eV1alpha1<'a> {
    clientset: &'a Clientset,
}

impl Co2eV1alpha1<'_> {
    pub fn cloud_carbon_footprints(&self) -> Box<dyn ResourceClient<CloudCarbonFootprint>> {
        self.clientset.resource(None)
    }
}

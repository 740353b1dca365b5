//! `autoscaling.crane.io/v1alpha1`: effective horizontal and vertical pod
//! autoscalers.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscalerBehavior, MetricSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::lib::apis::prediction::{AlgorithmType, Dsp, Percentile};
use crate::lib::object::{crane_object, is_zero};

pub const GROUP: &str = "autoscaling.crane.io";
pub const VERSION: &str = "v1alpha1";

/// Lower replica bound applied when `minReplicas` is absent
pub const DEFAULT_MIN_REPLICAS: i32 = 1;
/// Prediction window applied when `predictionWindowSeconds` is absent
pub const DEFAULT_PREDICTION_WINDOW_SECONDS: i32 = 600;
/// Stabilization window applied when `stabilizationWindowSeconds` is absent
pub const DEFAULT_STABILIZATION_WINDOW_SECONDS: i32 = 3600;
/// Container name of the policy that applies to containers without their own
pub const DEFAULT_CONTAINER_RESOURCE_POLICY: &str = "*";

/// `cpu` and `memory`, the resources controlled when none are listed
pub const DEFAULT_CONTROLLED_RESOURCES: [&str; 2] = ["cpu", "memory"];

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ScaleStrategy {
    /// Manage the underlying HPA and scale the target
    #[default]
    Auto,
    /// Only compute replicas; `specificReplicas` pins the target when set
    Preview,
}

impl fmt::Display for ScaleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleStrategy::Auto => write!(f, "Auto"),
            ScaleStrategy::Preview => write!(f, "Preview"),
        }
    }
}

/// EffectiveHorizontalPodAutoscaler scales a workload from metrics and
/// optional predictions of those metrics
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "autoscaling.crane.io",
    version = "v1alpha1",
    kind = "EffectiveHorizontalPodAutoscaler",
    plural = "effectivehorizontalpodautoscalers",
    shortname = "ehpa",
    namespaced,
    status = "EffectiveHorizontalPodAutoscalerStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Strategy","type":"string","jsonPath":".spec.scaleStrategy"}"#,
    printcolumn = r#"{"name":"MinPods","type":"integer","jsonPath":".spec.minReplicas"}"#,
    printcolumn = r#"{"name":"MaxPods","type":"integer","jsonPath":".spec.maxReplicas"}"#,
    printcolumn = r#"{"name":"SpecificPods","type":"integer","jsonPath":".spec.specificReplicas"}"#,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".status.expectReplicas"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveHorizontalPodAutoscalerSpec {
    pub scale_target_ref: CrossVersionObjectReference,

    /// Absent means 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    pub max_replicas: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<HorizontalPodAutoscalerBehavior>,

    /// Absent means Auto
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_strategy: Option<ScaleStrategy>,

    /// Replica count pinned in Preview mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_replicas: Option<i32>,

    /// Prediction is disabled when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
}

impl EffectiveHorizontalPodAutoscalerSpec {
    pub fn min_replicas(&self) -> i32 {
        self.min_replicas.unwrap_or(DEFAULT_MIN_REPLICAS)
    }

    pub fn scale_strategy(&self) -> ScaleStrategy {
        self.scale_strategy.unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// Seconds to predict into the future; absent means 600
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_window_seconds: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_algorithm: Option<PredictionAlgorithm>,
}

impl Prediction {
    pub fn window_seconds(&self) -> i32 {
        self.prediction_window_seconds
            .unwrap_or(DEFAULT_PREDICTION_WINDOW_SECONDS)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionAlgorithm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm_type: Option<AlgorithmType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsp: Option<Dsp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile: Option<Percentile>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveHorizontalPodAutoscalerStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scale_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// EffectiveVerticalPodAutoscaler recommends container resources through a
/// set of prioritized estimators
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "autoscaling.crane.io",
    version = "v1alpha1",
    kind = "EffectiveVerticalPodAutoscaler",
    plural = "effectiveverticalpodautoscalers",
    shortname = "evpa",
    namespaced,
    status = "EffectiveVerticalPodAutoscalerStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveVerticalPodAutoscalerSpec {
    pub target_ref: CrossVersionObjectReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<PodUpdatePolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_policy: Option<PodResourcePolicy>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_estimators: Vec<ResourceEstimator>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum UpdateMode {
    Off,
    Initial,
    Recreate,
    #[default]
    Auto,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodUpdatePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_mode: Option<UpdateMode>,

    /// Minimal live replicas required before an update evicts pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,
}

/// At most one entry per container, plus an optional `*` wildcard entry
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodResourcePolicy {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_policies: Vec<ContainerResourcePolicy>,
}

impl PodResourcePolicy {
    /// Policy of the named container, or the wildcard entry
    pub fn policy_for(&self, container: &str) -> Option<&ContainerResourcePolicy> {
        self.container_policies
            .iter()
            .find(|p| p.container_name == container)
            .or_else(|| {
                self.container_policies
                    .iter()
                    .find(|p| p.container_name == DEFAULT_CONTAINER_RESOURCE_POLICY)
            })
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ContainerControlledValues {
    #[default]
    RequestsAndLimits,
    RequestsOnly,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerResourcePolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_up_policy: Option<ContainerScalingPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_down_policy: Option<ContainerScalingPolicy>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub min_allowed: BTreeMap<String, Quantity>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub max_allowed: BTreeMap<String, Quantity>,

    /// Absent means cpu and memory; an explicit empty list controls nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controlled_resources: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controlled_values: Option<ContainerControlledValues>,
}

impl ContainerResourcePolicy {
    pub fn controlled_resources(&self) -> Vec<String> {
        match &self.controlled_resources {
            Some(resources) => resources.clone(),
            None => DEFAULT_CONTROLLED_RESOURCES
                .iter()
                .map(|r| r.to_string())
                .collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ContainerScalingMode {
    #[default]
    Auto,
    Off,
}

/// Scaling policy for one direction, up or down
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerScalingPolicy {
    #[serde(rename = "mode", default, skip_serializing_if = "Option::is_none")]
    pub scale_mode: Option<ContainerScalingMode>,

    /// Usage thresholds keyed by resource name; estimators trigger once
    /// reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_thresholds: Option<BTreeMap<String, ResourceMetric>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stabilization_window_seconds: Option<i32>,
}

impl ContainerScalingPolicy {
    pub fn stabilization_window_seconds(&self) -> i32 {
        self.stabilization_window_seconds
            .unwrap_or(DEFAULT_STABILIZATION_WINDOW_SECONDS)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_value: Option<Quantity>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEstimator {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub priority: i64,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveVerticalPodAutoscalerStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub current_estimators: Vec<ResourceEstimatorStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<RecommendedPodResources>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<VerticalPodAutoscalerCondition>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEstimatorStatus {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<RecommendedPodResources>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedPodResources {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_recommendations: Vec<RecommendedContainerResources>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedContainerResources {
    pub container_name: String,

    pub target: BTreeMap<String, Quantity>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lower_bound: BTreeMap<String, Quantity>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub upper_bound: BTreeMap<String, Quantity>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub uncapped_target: BTreeMap<String, Quantity>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerticalPodAutoscalerCondition {
    #[serde(rename = "type")]
    pub type_: String,

    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

crane_object!(EffectiveHorizontalPodAutoscaler, namespaced, ["ehpa"]);
crane_object!(EffectiveVerticalPodAutoscaler, namespaced, ["evpa"]);

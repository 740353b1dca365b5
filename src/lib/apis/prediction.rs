//! `prediction.crane.io/v1alpha1`: time series, pod group and node predictions.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::autoscaling::v2::CrossVersionObjectReference;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, Time};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::lib::object::{crane_object, is_zero};

pub const GROUP: &str = "prediction.crane.io";
pub const VERSION: &str = "v1alpha1";

pub const RESOURCE_CPU: &str = "cpu";
pub const RESOURCE_MEMORY: &str = "memory";

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmType {
    /// Exponentially decayed histogram
    Percentile,
    /// FFT based estimation of periodic series
    Dsp,
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmType::Percentile => write!(f, "percentile"),
            AlgorithmType::Dsp => write!(f, "dsp"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PredictionMode {
    /// A single point in the future, e.g. the maximum of the next hour
    Instant,
    /// A series over a future window
    Range,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum PredictionStatus {
    Pending,
    Predicting,
    NotStarted,
    Completed,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum PodGroupPredictionConditionType {
    Charging,
    Predicting,
    NotStarted,
    Finished,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum PredictionConditionType {
    Charging,
    Predicting,
    NotReady,
}

/// Operators of a metric selector query condition
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum QueryOperator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "=~")]
    EqualRegex,
    #[serde(rename = "in")]
    In,
}

/// Predicted series keyed by metric name
pub type Prediction = BTreeMap<String, TimeSeries>;

pub type TimeSeries = Vec<Vector>;

/// Values are strings because CRD schemas cannot carry float64
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vector {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub timestamp: i64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricPredictionConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metric_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm_type: Option<AlgorithmType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsp: Option<Dsp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile: Option<Percentile>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dsp {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sample_interval: String,

    /// How far back to query history, e.g. `7d`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub history_length: String,

    #[serde(rename = "estimators", default)]
    pub estimator: Estimator,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Estimator {
    #[serde(rename = "maxValue", default, skip_serializing_if = "Vec::is_empty")]
    pub max_value_estimators: Vec<MaxValueEstimator>,

    #[serde(rename = "fft", default, skip_serializing_if = "Vec::is_empty")]
    pub fft_estimators: Vec<FftEstimator>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct MaxValueEstimator {}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FftEstimator {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub margin_fraction: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub low_amplitude_threshold: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub high_frequency_threshold: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_num_of_spectrum_items: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_num_of_spectrum_items: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Percentile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sample_interval: String,

    #[serde(default)]
    pub histogram: HistogramConfig,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub min_sample_weight: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub margin_fraction: String,

    /// Quantile in `[0, 1]` as a decimal string
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub percentile: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistogramConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub max_value: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub epsilon: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub half_life: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket_size: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub first_bucket_size: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket_size_growth_ratio: String,
}

/// NodePrediction predicts resource usage of one node
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "prediction.crane.io",
    version = "v1alpha1",
    kind = "NodePrediction",
    plural = "nodepredictions",
    shortname = "np",
    status = "NodePredictionResourceStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct NodePredictionResourceSpec {
    /// Step of the predicted series, as a duration string
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub period: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<PredictionMode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_prediction_configs: Vec<MetricPredictionConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodePredictionResourceStatus {
    /// Usage predicted for the next resolution point
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub next_possible: Prediction,
}

/// PodGroupPrediction predicts resources consumed by a group of pods.
///
/// Pods are aggregated from `pods`, then `workloadRef`, then `labelSelector`,
/// whichever is set first.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "prediction.crane.io",
    version = "v1alpha1",
    kind = "PodGroupPrediction",
    plural = "podgrouppredictions",
    shortname = "pgp",
    namespaced,
    status = "PodGroupPredictionStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct PodGroupPredictionSpec {
    /// Defaults to the creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Time>,

    /// Prediction never stops when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Time>,

    /// Only meaningful in range mode
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prediction_window: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<PredictionMode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pods: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_ref: Option<CrossVersionObjectReference>,

    #[serde(default)]
    pub label_selector: LabelSelector,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_prediction_configs: Vec<MetricPredictionConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodGroupPredictionStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<PodGroupPredictionCondition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PredictionStatus>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aggregation: Prediction,

    /// Keyed by `namespace/pod/container`, pause containers excluded
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub containers: BTreeMap<String, Prediction>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodGroupPredictionCondition {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<PodGroupPredictionConditionType>,

    /// True, False or Unknown
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_probe_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// TimeSeriesPrediction predicts a set of metrics of one target
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "prediction.crane.io",
    version = "v1alpha1",
    kind = "TimeSeriesPrediction",
    plural = "timeseriespredictions",
    shortname = "tsp",
    namespaced,
    status = "TimeSeriesPredictionStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"TargetRefName","type":"string","jsonPath":".spec.targetRef.name"}"#,
    printcolumn = r#"{"name":"TargetRefKind","type":"string","jsonPath":".spec.targetRef.kind"}"#,
    printcolumn = r#"{"name":"PredictionWindowSeconds","type":"string","jsonPath":".spec.predictionWindowSeconds","priority":1}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPredictionSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prediction_metrics: Vec<PredictionMetric>,

    /// Object the predicted metrics belong to
    #[serde(default)]
    pub target_ref: ObjectReference,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub prediction_window_seconds: i32,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPredictionStatus {
    /// Keyed by the `resourceIdentifier` of each prediction metric
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prediction_metrics: BTreeMap<String, Vec<MetricTimeSeries>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<TimeSeriesPredictionCondition>,
}

impl TimeSeriesPredictionStatus {
    pub fn condition(&self, type_: PredictionConditionType) -> Option<&TimeSeriesPredictionCondition> {
        self.conditions.iter().find(|c| c.type_ == Some(type_))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPredictionCondition {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<PredictionConditionType>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_probe_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// What to predict, how to query it and which algorithm to use.
///
/// Exactly one of the query fields is expected to be set; which ones are
/// usable depends on the metric source the predictor runs against.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionMetric {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_identifier: String,

    /// Resource name of the target, such as `cpu`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_query: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_selector: Option<MetricSelector>,

    /// Query in the source's own language, e.g. PromQL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,

    #[serde(default)]
    pub algorithm: Algorithm,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricSelector {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metric_name: String,

    #[serde(rename = "labels", default, skip_serializing_if = "Vec::is_empty")]
    pub query_conditions: Vec<QueryCondition>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Query {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub expression: String,
}

/// `key operator values`, e.g. `namespace = default`
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryCondition {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<QueryOperator>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Algorithm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm_type: Option<AlgorithmType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dsp: Option<Dsp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile: Option<Percentile>,
}

/// Samples of one labelled series, in chronological order
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricTimeSeries {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<Sample>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub timestamp: i64,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Label {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

/// ClusterNodePrediction stamps out one TimeSeriesPrediction per selected node
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "prediction.crane.io",
    version = "v1alpha1",
    kind = "ClusterNodePrediction",
    plural = "clusternodepredictions",
    shortname = "cnp",
    namespaced,
    status = "ClusterNodePredictionStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"NodeSelector","type":"string","jsonPath":".spec.nodeSelector"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNodePredictionSpec {
    #[serde(default)]
    pub prediction_template: PredictionTemplate,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,
}

/// Template of the per-node TimeSeriesPrediction objects
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionTemplate {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default)]
    pub spec: TimeSeriesPredictionSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNodePredictionStatus {
    #[serde(default)]
    pub desired_number_created: i32,

    #[serde(default)]
    pub current_number_created: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition>,
}

crane_object!(TimeSeriesPrediction, namespaced, ["tsp"]);
crane_object!(PodGroupPrediction, namespaced, ["pgp"]);
crane_object!(NodePrediction, cluster, ["np"]);
crane_object!(ClusterNodePrediction, namespaced, ["cnp"]);

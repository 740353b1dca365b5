//! `ensurance.crane.io/v1alpha1`: pod and node QoS, avoidance actions and the
//! older objective-based ensurance policies.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::core::v1::HTTPGetAction;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::lib::object::{crane_object, is_false, is_zero};

pub const GROUP: &str = "ensurance.crane.io";
pub const VERSION: &str = "v1alpha1";

pub const DEFAULT_COOL_DOWN_SECONDS: i64 = 300;
pub const DEFAULT_THROTTLE_PERIOD_SECONDS: i32 = 10;
pub const DEFAULT_PROBE_INITIAL_DELAY_SECONDS: i32 = 5;
pub const DEFAULT_NODE_PROBE_TIMEOUT_SECONDS: i32 = 1;
pub const DEFAULT_LOCAL_CACHE_TTL_SECONDS: i32 = 60;
pub const DEFAULT_MAX_HOUSEKEEPING_INTERVAL_SECONDS: i32 = 60;
/// Threshold counts applied when a rule leaves them unset
pub const DEFAULT_RULE_THRESHOLD: i32 = 1;

/// PodQOS applies resource QoS knobs to the pods it selects
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ensurance.crane.io",
    version = "v1alpha1",
    kind = "PodQOS",
    plural = "podqoss",
    shortname = "pqos",
    status = "PodQOSStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct PodQOSSpec {
    #[serde(default)]
    pub label_selector: LabelSelector,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_selector: Option<ScopeSelector>,

    /// Names of the avoidance actions allowed on the selected pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_actions: Vec<String>,

    #[serde(rename = "resourceQOS", default)]
    pub resource_qos: ResourceQOS,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct PodQOSStatus {}

/// Every requirement must hold for a pod to be in scope
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScopeSelector {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<ScopedResourceSelectorRequirement>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ScopeName {
    QOSClass,
    Priority,
    Namespace,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ScopeSelectorOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
    LessThan,
    GreaterThan,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScopedResourceSelectorRequirement {
    pub scope_name: ScopeName,

    pub operator: ScopeSelectorOperator,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ResourceQOS {
    #[serde(rename = "cpuQOS", default, skip_serializing_if = "Option::is_none")]
    pub cpu_qos: Option<CPUQOS>,

    #[serde(rename = "memoryQOS", default, skip_serializing_if = "Option::is_none")]
    pub memory_qos: Option<MemoryQOS>,

    #[serde(rename = "netIOQOS", default, skip_serializing_if = "Option::is_none")]
    pub net_io_qos: Option<NetIOQOS>,

    #[serde(rename = "diskIOQOS", default, skip_serializing_if = "Option::is_none")]
    pub disk_io_qos: Option<DiskIOQOS>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum CPUSetPolicy {
    None,
    Exclusive,
    Share,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CPUQOS {
    /// 0 is the highest priority, 7 the lowest
    #[serde(rename = "cpuPriority", default, skip_serializing_if = "Option::is_none")]
    pub cpu_priority: Option<i32>,

    #[serde(rename = "cpuBurst", default)]
    pub cpu_burst: CPUBurst,

    #[serde(rename = "cpuSet", default, skip_serializing_if = "Option::is_none")]
    pub cpu_set: Option<CPUSetPolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rdt: Option<RDT>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CPUBurst {
    #[serde(rename = "cpuBurstPercent", default, skip_serializing_if = "Option::is_none")]
    pub cpu_burst_percent: Option<i32>,

    #[serde(rename = "cfsQuotaBurstPercent", default, skip_serializing_if = "Option::is_none")]
    pub cfs_quota_burst_percent: Option<i32>,
}

/// Intel resource director settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RDT {
    /// Ways of the L3 cache, as a percentage
    #[serde(rename = "l3CachePercent", default, skip_serializing_if = "Option::is_none")]
    pub l3_cache_percent: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_bandwidth_percent: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryQOS {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_priority: Option<i32>,

    /// Percent of the limit above which background reclaim starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark_ratio: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_compression: Option<MemoryCompression>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetIOQOS {
    #[serde(rename = "netIOPriority", default, skip_serializing_if = "Option::is_none")]
    pub net_io_priority: Option<i32>,

    /// Bandwidth limit such as `100Mbps`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ingress_limits: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub egress_limits: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiskIOQOS {
    #[serde(rename = "diskIOLimit", default)]
    pub disk_io_limit: DiskIOLimit,

    #[serde(rename = "diskIOPriority", default, skip_serializing_if = "Option::is_none")]
    pub disk_io_priority: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiskIOLimit {
    #[serde(rename = "readIOps", default, skip_serializing_if = "Option::is_none")]
    pub read_iops: Option<i64>,

    #[serde(rename = "writeIOps", default, skip_serializing_if = "Option::is_none")]
    pub write_iops: Option<i64>,

    #[serde(rename = "readBps", default, skip_serializing_if = "Option::is_none")]
    pub read_bps: Option<i64>,

    #[serde(rename = "writeBps", default, skip_serializing_if = "Option::is_none")]
    pub write_bps: Option<i64>,
}

/// NodeQOS watches node quality and triggers avoidance actions on rule hits
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ensurance.crane.io",
    version = "v1alpha1",
    kind = "NodeQOS",
    plural = "nodeqoss",
    shortname = "nqos",
    status = "NodeQOSStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct NodeQOSSpec {
    /// Selects nodes by label
    #[serde(default)]
    pub selector: LabelSelector,

    #[serde(default)]
    pub node_quality_probe: NodeQualityProbe,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,

    #[serde(rename = "elasticCpu", default)]
    pub elastic_cpu: ElasticCPU,

    #[serde(default)]
    pub memory_compression: MemoryCompression,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct NodeQOSStatus {}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeQualityProbe {
    #[serde(rename = "httpGet", default, skip_serializing_if = "Option::is_none")]
    pub http_get: Option<HTTPGetAction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_local_get: Option<NodeLocalGet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_seconds: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i32>,
}

impl NodeQualityProbe {
    pub fn initial_delay_seconds(&self) -> i32 {
        self.initial_delay_seconds
            .unwrap_or(DEFAULT_PROBE_INITIAL_DELAY_SECONDS)
    }

    pub fn timeout_seconds(&self) -> i32 {
        self.timeout_seconds.unwrap_or(DEFAULT_NODE_PROBE_TIMEOUT_SECONDS)
    }
}

/// Fetch node metrics locally instead of over HTTP
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeLocalGet {
    #[serde(rename = "localCacheTTLSeconds", default, skip_serializing_if = "Option::is_none")]
    pub local_cache_ttl_seconds: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_housekeeping_interval_seconds: Option<i32>,
}

impl NodeLocalGet {
    pub fn local_cache_ttl_seconds(&self) -> i32 {
        self.local_cache_ttl_seconds
            .unwrap_or(DEFAULT_LOCAL_CACHE_TTL_SECONDS)
    }

    pub fn max_housekeeping_interval_seconds(&self) -> i32 {
        self.max_housekeeping_interval_seconds
            .unwrap_or(DEFAULT_MAX_HOUSEKEEPING_INTERVAL_SECONDS)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum AvoidanceActionStrategy {
    /// Run the action when the rule triggers
    #[default]
    None,
    /// Only record that the action would have run
    Preview,
}

impl fmt::Display for AvoidanceActionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvoidanceActionStrategy::None => write!(f, "None"),
            AvoidanceActionStrategy::Preview => write!(f, "Preview"),
        }
    }
}

/// A metric threshold and the action fired once it has been reached
/// `avoidanceThreshold` times in a row
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<AvoidanceActionStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_rule: Option<MetricRule>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub avoidance_threshold: i32,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub restore_threshold: i32,

    #[serde(rename = "actionName")]
    pub avoidance_action_name: String,
}

impl Rule {
    pub fn is_preview(&self) -> bool {
        self.strategy == Some(AvoidanceActionStrategy::Preview)
    }

    pub fn avoidance_threshold(&self) -> i32 {
        non_zero_or(self.avoidance_threshold, DEFAULT_RULE_THRESHOLD)
    }

    pub fn restore_threshold(&self) -> i32 {
        non_zero_or(self.restore_threshold, DEFAULT_RULE_THRESHOLD)
    }
}

fn non_zero_or(value: i32, default: i32) -> i32 {
    if value == 0 { default } else { value }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricRule {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,

    /// Threshold value of the metric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Quantity>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ElasticCPU {
    #[serde(default, skip_serializing_if = "is_false")]
    pub enable: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryCompression {
    #[serde(default, skip_serializing_if = "is_false")]
    pub enable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<i32>,
}

/// AvoidanceAction is a named remediation: throttle or evict, followed by a
/// cool-down period
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ensurance.crane.io",
    version = "v1alpha1",
    kind = "AvoidanceAction",
    plural = "avoidanceactions",
    shortname = "aa",
    status = "AvoidanceActionStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct AvoidanceActionSpec {
    /// Absent means 300
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cool_down_seconds: Option<i64>,

    #[serde(rename = "Throttle", default, skip_serializing_if = "Option::is_none")]
    pub throttle: Option<ThrottleAction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eviction: Option<EvictionAction>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl AvoidanceActionSpec {
    pub fn cool_down_seconds(&self) -> i64 {
        self.cool_down_seconds.unwrap_or(DEFAULT_COOL_DOWN_SECONDS)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct AvoidanceActionStatus {}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleAction {
    #[serde(rename = "cpuThrottle", default)]
    pub cpu_throttle: CPUThrottle,

    #[serde(default)]
    pub memory_throttle: MemoryThrottle,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CPUThrottle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<i32>,

    /// Floor for low priority pods as a percent of their limit
    #[serde(rename = "minCPURatio", default, skip_serializing_if = "is_zero")]
    pub min_cpu_ratio: u64,

    /// Percent of share and limit removed per step, 1-100
    #[serde(rename = "stepCPURatio", default, skip_serializing_if = "is_zero")]
    pub step_cpu_ratio: u64,
}

impl CPUThrottle {
    pub fn period_seconds(&self) -> i32 {
        self.period_seconds.unwrap_or(DEFAULT_THROTTLE_PERIOD_SECONDS)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryThrottle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<i32>,

    /// Drop the page cache of low priority pods
    #[serde(rename = "forceGC", default, skip_serializing_if = "is_false")]
    pub force_gc: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvictionAction {
    /// Zero deletes immediately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_grace_period_seconds: Option<i32>,
}

/// PodQOSEnsurancePolicy is the older per-pod objective policy
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ensurance.crane.io",
    version = "v1alpha1",
    kind = "PodQOSEnsurancePolicy",
    plural = "podqosensurancepolicies",
    namespaced,
    status = "PodQOSEnsurancePolicyStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct PodQOSEnsurancePolicySpec {
    #[serde(default)]
    pub selector: LabelSelector,

    #[serde(default)]
    pub quality_probe: QualityProbe,

    #[serde(rename = "objectiveEnsurance", default, skip_serializing_if = "Vec::is_empty")]
    pub objective_ensurances: Vec<ObjectiveEnsurance>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct PodQOSEnsurancePolicyStatus {}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualityProbe {
    #[serde(rename = "httpGet", default, skip_serializing_if = "Option::is_none")]
    pub http_get: Option<HTTPGetAction>,

    /// Absent means 5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_seconds: Option<i32>,

    /// Absent means no timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i32>,
}

/// NodeQOSEnsurancePolicy is the older per-node objective policy
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ensurance.crane.io",
    version = "v1alpha1",
    kind = "NodeQOSEnsurancePolicy",
    plural = "nodeqosensurancepolicies",
    namespaced,
    status = "NodeQOSEnsurancePolicyStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct NodeQOSEnsurancePolicySpec {
    #[serde(default)]
    pub selector: LabelSelector,

    #[serde(default)]
    pub node_quality_probe: NodeQualityProbe,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objective_ensurances: Vec<ObjectiveEnsurance>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct NodeQOSEnsurancePolicyStatus {}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveEnsurance {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_rule: Option<ObjectiveMetricRule>,

    /// Consecutive hits before the action fires; zero means 1
    #[serde(default, skip_serializing_if = "is_zero")]
    pub reached_threshold: i32,

    /// Consecutive misses before the action is restored; zero means 1
    #[serde(default, skip_serializing_if = "is_zero")]
    pub restored_threshold: i32,

    #[serde(rename = "actionName")]
    pub avoidance_action_name: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub dry_run: bool,
}

impl ObjectiveEnsurance {
    pub fn reached_threshold(&self) -> i32 {
        non_zero_or(self.reached_threshold, DEFAULT_RULE_THRESHOLD)
    }

    pub fn restored_threshold(&self) -> i32 {
        non_zero_or(self.restored_threshold, DEFAULT_RULE_THRESHOLD)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ObjectiveMetricRule {
    pub metric: MetricIdentifier,

    /// Always written, `null` when unset
    pub target: Option<MetricTarget>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct MetricIdentifier {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum MetricTargetType {
    #[default]
    Utilization,
    Value,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct MetricTarget {
    #[serde(rename = "type")]
    pub type_: MetricTargetType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Quantity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization: Option<i32>,
}

/// Resource QoS of a pod keyed by container for policy reports
pub type ContainerQOS = BTreeMap<String, ResourceQOS>;

crane_object!(PodQOS, cluster, ["pqos"]);
crane_object!(NodeQOS, cluster, ["nqos"]);
crane_object!(AvoidanceAction, cluster, ["aa"]);
crane_object!(PodQOSEnsurancePolicy, namespaced, []);
crane_object!(NodeQOSEnsurancePolicy, namespaced, []);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn avoidance_action_keeps_capitalized_throttle() {
        let action: AvoidanceAction = serde_yaml::from_str(
            r#"
apiVersion: ensurance.crane.io/v1alpha1
kind: AvoidanceAction
metadata:
  name: throttle
spec:
  coolDownSeconds: 300
  description: throttle low priority pods
  Throttle:
    cpuThrottle:
      minCPURatio: 10
      stepCPURatio: 10
    memoryThrottle:
      forceGC: true
"#,
        )
        .unwrap();

        let throttle = action.spec.throttle.as_ref().unwrap();
        assert_eq!(throttle.cpu_throttle.min_cpu_ratio, 10);
        assert_eq!(throttle.cpu_throttle.period_seconds(), DEFAULT_THROTTLE_PERIOD_SECONDS);
        assert!(throttle.memory_throttle.force_gc);
        assert!(action.spec.eviction.is_none());

        let value = serde_json::to_value(&action).unwrap();
        assert!(value["spec"].get("throttle").is_none());
        assert_eq!(value["spec"]["Throttle"]["cpuThrottle"]["stepCPURatio"], 10);
        assert_eq!(value["spec"]["Throttle"]["memoryThrottle"]["forceGC"], true);
    }

    #[test]
    fn avoidance_action_defaults() {
        let spec = AvoidanceActionSpec {
            eviction: Some(EvictionAction {
                termination_grace_period_seconds: Some(0),
            }),
            ..Default::default()
        };
        assert_eq!(spec.cool_down_seconds(), 300);
        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({"eviction": {"terminationGracePeriodSeconds": 0}})
        );
    }

    #[test]
    fn pod_qos_resource_knobs() {
        let qos: PodQOS = serde_json::from_value(json!({
            "apiVersion": "ensurance.crane.io/v1alpha1",
            "kind": "PodQOS",
            "metadata": {"name": "offline"},
            "spec": {
                "labelSelector": {"matchLabels": {"preemptible_job": "true"}},
                "scopeSelector": {
                    "matchExpressions": [{"scopeName": "QOSClass", "operator": "In", "values": ["BestEffort"]}]
                },
                "allowedActions": ["eviction"],
                "resourceQOS": {
                    "cpuQOS": {"cpuPriority": 7, "cpuSet": "Share", "cpuBurst": {"cpuBurstPercent": 50}},
                    "netIOQOS": {"netIOPriority": 2, "ingressLimits": "100Mbps"},
                    "diskIOQOS": {"diskIOLimit": {"readBps": 1048576}}
                }
            }
        }))
        .unwrap();

        let cpu = qos.spec.resource_qos.cpu_qos.as_ref().unwrap();
        assert_eq!(cpu.cpu_priority, Some(7));
        assert_eq!(cpu.cpu_set, Some(CPUSetPolicy::Share));
        assert_eq!(cpu.cpu_burst.cpu_burst_percent, Some(50));
        assert!(qos.spec.resource_qos.memory_qos.is_none());
        assert_eq!(
            qos.spec.scope_selector.as_ref().unwrap().match_expressions[0].scope_name,
            ScopeName::QOSClass
        );

        let value = serde_json::to_value(&qos).unwrap();
        let resource_qos = &value["spec"]["resourceQOS"];
        assert_eq!(resource_qos["netIOQOS"]["ingressLimits"], "100Mbps");
        assert_eq!(resource_qos["diskIOQOS"]["diskIOLimit"]["readBps"], 1048576);
        assert!(resource_qos.get("memoryQOS").is_none());
    }

    #[test]
    fn node_qos_rules() {
        let spec: NodeQOSSpec = serde_yaml::from_str(
            r#"
nodeQualityProbe:
  nodeLocalGet:
    localCacheTTLSeconds: 60
  timeoutSeconds: 10
rules:
  - name: cpu-usage
    strategy: Preview
    avoidanceThreshold: 2
    metricRule:
      name: cpu_total_usage
      value: "4000"
    actionName: throttle
  - name: memory-usage
    metricRule:
      name: memory_total_utilization
      value: "70"
    actionName: eviction
elasticCpu:
  enable: true
"#,
        )
        .unwrap();

        let probe = spec.node_quality_probe.node_local_get.as_ref().unwrap();
        assert_eq!(probe.local_cache_ttl_seconds(), 60);
        assert_eq!(probe.max_housekeeping_interval_seconds(), 60);
        assert_eq!(spec.node_quality_probe.initial_delay_seconds(), 5);
        assert_eq!(spec.node_quality_probe.timeout_seconds(), 10);

        assert!(spec.rules[0].is_preview());
        assert_eq!(spec.rules[0].avoidance_threshold(), 2);
        assert!(!spec.rules[1].is_preview());
        assert_eq!(spec.rules[1].restore_threshold(), DEFAULT_RULE_THRESHOLD);
        assert!(spec.elastic_cpu.enable);

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["rules"][1]["actionName"], "eviction");
        assert!(value["rules"][1].get("strategy").is_none());
        assert_eq!(value["memoryCompression"], json!({}));
    }

    #[test]
    fn objective_rule_without_target() {
        let wire = json!({"metric": {"name": "cpu_total_usage"}, "target": null});
        let rule: ObjectiveMetricRule = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(rule.target, None);
        assert_eq!(serde_json::to_value(&rule).unwrap(), wire);

        let missing: ObjectiveMetricRule =
            serde_json::from_value(json!({"metric": {"name": "cpu_total_usage"}})).unwrap();
        assert_eq!(missing, rule);
    }

    #[test]
    fn rule_strategy_rejects_unknown_value() {
        let result = serde_json::from_value::<Rule>(json!({"strategy": "DryRun", "actionName": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn historical_policies_use_distinct_list_names() {
        let ensurance = ObjectiveEnsurance {
            name: "cpu".into(),
            metric_rule: Some(ObjectiveMetricRule {
                metric: MetricIdentifier {
                    name: "cpu_total_usage".into(),
                    selector: None,
                },
                target: Some(MetricTarget {
                    type_: MetricTargetType::Value,
                    value: Some(Quantity("4".into())),
                    utilization: None,
                }),
            }),
            avoidance_action_name: "throttle".into(),
            dry_run: true,
            ..Default::default()
        };

        let pod = PodQOSEnsurancePolicySpec {
            objective_ensurances: vec![ensurance.clone()],
            ..Default::default()
        };
        let node = NodeQOSEnsurancePolicySpec {
            objective_ensurances: vec![ensurance.clone()],
            ..Default::default()
        };

        let pod_value = serde_json::to_value(&pod).unwrap();
        let node_value = serde_json::to_value(&node).unwrap();
        assert!(pod_value.get("objectiveEnsurance").is_some());
        assert!(node_value.get("objectiveEnsurances").is_some());
        assert_eq!(
            node_value["objectiveEnsurances"][0]["metricRule"]["target"],
            json!({"type": "Value", "value": "4"})
        );
        assert_eq!(pod_value["objectiveEnsurance"][0]["dryRun"], true);
        assert_eq!(ensurance.reached_threshold(), 1);
    }

    #[test]
    fn ensurance_scopes() {
        use crate::lib::object::CraneObject;

        assert!(!PodQOS::NAMESPACED);
        assert!(!NodeQOS::NAMESPACED);
        assert!(!AvoidanceAction::NAMESPACED);
        assert!(PodQOSEnsurancePolicy::NAMESPACED);
        assert!(NodeQOSEnsurancePolicy::SHORT_NAMES.is_empty());
        assert_eq!(PodQOS::resource_name(), "podqoss");
    }
}

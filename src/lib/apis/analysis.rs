//! `analysis.crane.io/v1alpha1`: recommendations, analytics, recommendation
//! rules and recommendation config sets.

use std::collections::BTreeMap;

use k8s_openapi::api::autoscaling::v2::MetricSpec;
use k8s_openapi::api::core::v1::{Container, ObjectReference, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, LabelSelector, ObjectMeta, Time};
use kube::CustomResource;
use kube::core::TypeMeta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::lib::apis::autoscaling::Prediction;
use crate::lib::object::{crane_object, is_false, is_zero};

pub const GROUP: &str = "analysis.crane.io";
pub const VERSION: &str = "v1alpha1";

/// Replicas recommender name
pub const REPLICAS_RECOMMENDER: &str = "Replicas";
/// Resource recommender name
pub const RESOURCE_RECOMMENDER: &str = "Resource";
/// HPA recommender name
pub const HPA_RECOMMENDER: &str = "HPA";
/// Idle node recommender name
pub const IDLE_NODE_RECOMMENDER: &str = "IdleNode";

/// Every recommender known to the platform, in registration order
pub const ALL_RECOMMENDER_TYPES: [&str; 4] = [
    REPLICAS_RECOMMENDER,
    RESOURCE_RECOMMENDER,
    HPA_RECOMMENDER,
    IDLE_NODE_RECOMMENDER,
];

pub fn all_recommender_types() -> &'static [&'static str] {
    &ALL_RECOMMENDER_TYPES
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum AnalysisType {
    #[default]
    Replicas,
    Resource,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum CompletionStrategyType {
    Periodical,
    #[default]
    Once,
}

/// How a recommendation value is adopted by its target
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum AdoptionType {
    Status,
    #[default]
    StatusAndAnnotation,
    Auto,
}

/// How to complete a recommendation or an analytics request
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStrategy {
    /// Once or Periodical; absent means Once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_strategy_type: Option<CompletionStrategyType>,

    /// Period in seconds between two runs of a periodical strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<i64>,
}

impl CompletionStrategy {
    pub fn once() -> Self {
        Self {
            completion_strategy_type: Some(CompletionStrategyType::Once),
            period_seconds: None,
        }
    }

    pub fn periodical(period_seconds: i64) -> Self {
        Self {
            completion_strategy_type: Some(CompletionStrategyType::Periodical),
            period_seconds: Some(period_seconds),
        }
    }

    pub fn strategy_type(&self) -> CompletionStrategyType {
        self.completion_strategy_type.unwrap_or_default()
    }
}

/// Recommendation describes what to recommend for a single target
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "analysis.crane.io",
    version = "v1alpha1",
    kind = "Recommendation",
    plural = "recommendations",
    shortname = "recommend",
    namespaced,
    status = "RecommendationStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"TargetKind","type":"string","jsonPath":".spec.targetRef.kind"}"#,
    printcolumn = r#"{"name":"TargetNamespace","type":"string","jsonPath":".spec.targetRef.namespace"}"#,
    printcolumn = r#"{"name":"TargetName","type":"string","jsonPath":".spec.targetRef.name"}"#,
    printcolumn = r#"{"name":"Strategy","type":"string","jsonPath":".spec.completionStrategy.completionStrategyType"}"#,
    printcolumn = r#"{"name":"PeriodSeconds","type":"string","jsonPath":".spec.completionStrategy.periodSeconds"}"#,
    printcolumn = r#"{"name":"AdoptionType","type":"string","jsonPath":".spec.adoptionType"}"#,
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSpec {
    pub target_ref: ObjectReference,

    #[serde(rename = "type")]
    pub type_: AnalysisType,

    #[serde(default)]
    pub completion_strategy: CompletionStrategy,

    /// Absent means StatusAndAnnotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adoption_type: Option<AdoptionType>,
}

/// Result of one recommendation run
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationContent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recommended_value: String,

    #[serde(default)]
    pub target_ref: ObjectReference,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recommended_info: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_info: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationStatus {
    #[serde(flatten)]
    pub content: RecommendationContent,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<Time>,
}

/// Analytics selects a set of workloads and runs recommendations against them
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "analysis.crane.io",
    version = "v1alpha1",
    kind = "Analytics",
    plural = "analytics",
    shortname = "analytics",
    namespaced,
    status = "AnalyticsStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Strategy","type":"string","jsonPath":".spec.completionStrategy.completionStrategyType"}"#,
    printcolumn = r#"{"name":"PeriodSeconds","type":"string","jsonPath":".spec.completionStrategy.periodSeconds"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSpec {
    #[serde(rename = "type")]
    pub type_: AnalysisType,

    pub resource_selectors: Vec<ResourceSelector>,

    #[serde(default)]
    pub completion_strategy: CompletionStrategy,

    /// Overrides for recommendation configs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Missions that run in parallel, one per matched target
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<RecommendationMission>,
}

/// A recommendation run for one target, inlining a reference to the
/// Recommendation object that holds its result
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationMission {
    #[serde(flatten)]
    pub object_ref: ObjectReference,

    #[serde(default)]
    pub target_ref: ObjectReference,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_start_time: Option<Time>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    #[serde(default)]
    pub recommender_ref: Recommender,
}

/// Selects resources (e.g. a set of Deployments) by kind, name or labels
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    pub kind: String,

    #[serde(default)]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
}

/// RecommendationRule schedules recommenders over selected resources
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "analysis.crane.io",
    version = "v1alpha1",
    kind = "RecommendationRule",
    plural = "recommendationrules",
    shortname = "rr",
    status = "RecommendationRuleStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"RunInterval","type":"string","jsonPath":".spec.runInterval"}"#,
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRuleSpec {
    pub resource_selectors: Vec<ResourceSelector>,

    #[serde(default)]
    pub namespace_selector: NamespaceSelector,

    /// Interval between two runs, as a duration string such as "24h"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub run_interval: String,

    /// `None` is written as `null`, an empty list as `[]`
    pub recommenders: Option<Vec<Recommender>>,
}

impl RecommendationRuleSpec {
    pub fn recommenders(&self) -> &[Recommender] {
        self.recommenders.as_deref().unwrap_or_default()
    }
}

/// Refers to a recommender registered in the recommendation configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommender {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSelector {
    /// Select every namespace
    #[serde(default, skip_serializing_if = "is_false")]
    pub any: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_names: Vec<String>,
}

impl NamespaceSelector {
    pub fn matches(&self, namespace: &str) -> bool {
        self.any || self.match_names.iter().any(|n| n == namespace)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRuleStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<Time>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<RecommendationMission>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub run_number: i32,
}

/// ConfigSet carries recommendation property overrides per target.
///
/// Its fields sit beside the metadata rather than under a spec.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSet {
    #[serde(flatten, default)]
    #[schemars(skip)]
    pub types: Option<TypeMeta>,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configs: Vec<ConfigSetConfig>,
}

impl ConfigSet {
    pub fn new(name: &str, configs: Vec<ConfigSetConfig>) -> Self {
        Self {
            types: Some(TypeMeta {
                api_version: <Self as k8s_openapi::Resource>::API_VERSION.to_string(),
                kind: <Self as k8s_openapi::Resource>::KIND.to_string(),
            }),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            configs,
        }
    }

    /// Properties that apply to a target, later matching entries overriding
    /// earlier ones
    pub fn properties_for(&self, namespace: &str, kind: &str, name: &str) -> BTreeMap<String, String> {
        let mut merged = BTreeMap::new();
        for config in &self.configs {
            if config.targets.is_empty() || config.targets.iter().any(|t| t.matches(namespace, kind, name)) {
                merged.extend(config.properties.clone());
            }
        }
        merged
    }
}

impl k8s_openapi::Resource for ConfigSet {
    const API_VERSION: &'static str = "analysis.crane.io/v1alpha1";
    const GROUP: &'static str = GROUP;
    const KIND: &'static str = "ConfigSet";
    const VERSION: &'static str = VERSION;
    const URL_PATH_SEGMENT: &'static str = "configsets";
    type Scope = k8s_openapi::NamespaceResourceScope;
}

impl k8s_openapi::Metadata for ConfigSet {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Self::Ty {
        &mut self.metadata
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSetConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<Target>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

/// Empty fields act as wildcards
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

impl Target {
    pub fn matches(&self, namespace: &str, kind: &str, name: &str) -> bool {
        let field = |want: &str, got: &str| want.is_empty() || want == got;
        field(&self.namespace, namespace) && field(&self.kind, kind) && field(&self.name, name)
    }
}

/// Proposed result of one recommendation
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProposedRecommendation {
    /// Proposal for the Replicas recommender expressed as an EHPA spec
    #[serde(rename = "effectiveHPA", default, skip_serializing_if = "Option::is_none")]
    pub effective_hpa: Option<EffectiveHorizontalPodAutoscalerRecommendation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas_recommendation: Option<ReplicasRecommendation>,

    /// Proposal for the Resource recommender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_request: Option<ResourceRequestRecommendation>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicasRecommendation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveHorizontalPodAutoscalerRecommendation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequestRecommendation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<ContainerRecommendation>,
}

/// Recommended requests for one container, keyed by resource name
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecommendation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub container_name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub target: BTreeMap<String, String>,
}

/// Merge patch body setting a workload's replica count
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PatchReplicas {
    #[serde(default)]
    pub spec: PatchReplicasSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PatchReplicasSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
}

impl PatchReplicas {
    pub fn new(replicas: i32) -> Self {
        Self {
            spec: PatchReplicasSpec {
                replicas: Some(replicas),
            },
        }
    }
}

/// Strategic merge patch body setting container requests of a pod template
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PatchResource {
    #[serde(default)]
    pub spec: PatchResourceSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PatchResourceSpec {
    pub template: PatchResourcePodTemplateSpec,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PatchResourcePodTemplateSpec {
    #[serde(default)]
    pub spec: PatchResourcePodSpec,
}

/// Containers merge by name
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PatchResourcePodSpec {
    pub containers: Vec<Container>,
}

impl From<&ResourceRequestRecommendation> for PatchResource {
    fn from(recommendation: &ResourceRequestRecommendation) -> Self {
        let containers = recommendation
            .containers
            .iter()
            .map(|c| Container {
                name: c.container_name.clone(),
                resources: Some(ResourceRequirements {
                    requests: Some(
                        c.target
                            .iter()
                            .map(|(resource, value)| (resource.clone(), Quantity(value.clone())))
                            .collect(),
                    ),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .collect();

        Self {
            spec: PatchResourceSpec {
                template: PatchResourcePodTemplateSpec {
                    spec: PatchResourcePodSpec { containers },
                },
            },
        }
    }
}

crane_object!(Recommendation, namespaced, ["recommend"]);
crane_object!(Analytics, namespaced, ["analytics"]);
crane_object!(ConfigSet, namespaced, ["cs"]);
crane_object!(RecommendationRule, cluster, ["rr"]);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_spec<T: serde::de::DeserializeOwned>(yaml: &str) -> T {
        serde_yaml::from_str(yaml).expect("parse yaml")
    }

    #[test]
    fn recommendation_without_status_roundtrips() {
        let spec: RecommendationSpec = parse_spec(
            r#"
targetRef:
  apiVersion: apps/v1
  kind: Deployment
  namespace: default
  name: nginx
type: Resource
"#,
        );
        let rec = Recommendation::new("nginx-resource", spec);

        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["apiVersion"], "analysis.crane.io/v1alpha1");
        assert_eq!(value["kind"], "Recommendation");
        assert_eq!(value["spec"]["type"], "Resource");
        // Struct-valued completion strategy is always present, the optional
        // adoption type is not.
        assert_eq!(value["spec"]["completionStrategy"], json!({}));
        assert!(value["spec"].get("adoptionType").is_none());
        assert!(value.get("status").is_none());

        let back: Recommendation = serde_json::from_value(value).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn recommendation_status_inlines_content() {
        let status: RecommendationStatus = serde_json::from_value(json!({
            "recommendedValue": "replicas: 3\n",
            "targetRef": {"kind": "Deployment", "name": "nginx"},
            "action": "Patch",
            "conditions": [{
                "type": "Ready",
                "status": "True",
                "reason": "RecommendationReady",
                "message": "ok",
                "lastTransitionTime": "2024-01-01T00:00:00Z"
            }]
        }))
        .unwrap();

        assert_eq!(status.content.recommended_value, "replicas: 3\n");
        assert_eq!(status.content.target_ref.name.as_deref(), Some("nginx"));
        assert_eq!(status.conditions[0].type_, "Ready");

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["action"], "Patch");
        assert!(value.get("content").is_none());
        assert!(value.get("description").is_none());
    }

    #[test]
    fn completion_strategy_defaults_to_once() {
        assert_eq!(CompletionStrategy::default().strategy_type(), CompletionStrategyType::Once);
        let periodical = CompletionStrategy::periodical(86400);
        assert_eq!(
            serde_json::to_value(&periodical).unwrap(),
            json!({"completionStrategyType": "Periodical", "periodSeconds": 86400})
        );
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let result: Result<RecommendationSpec, _> = serde_json::from_value(json!({
            "targetRef": {},
            "type": "Vertical"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn analytics_mission_inlines_object_reference() {
        let mission: RecommendationMission = serde_json::from_value(json!({
            "kind": "Recommendation",
            "namespace": "crane-system",
            "name": "nginx-replicas",
            "uid": "1234",
            "targetRef": {"kind": "Deployment", "name": "nginx"},
            "message": "Success",
            "recommenderRef": {"name": "Replicas"}
        }))
        .unwrap();
        assert_eq!(mission.object_ref.name.as_deref(), Some("nginx-replicas"));
        assert_eq!(mission.recommender_ref.name, REPLICAS_RECOMMENDER);

        let value = serde_json::to_value(&mission).unwrap();
        assert_eq!(value["uid"], "1234");
        assert!(value.get("lastStartTime").is_none());
    }

    #[test]
    fn recommendation_rule_is_cluster_scoped() {
        use crate::lib::object::CraneObject;
        use kube::Resource;

        assert!(!RecommendationRule::NAMESPACED);
        assert_eq!(RecommendationRule::plural(&()), "recommendationrules");
        assert_eq!(RecommendationRule::SHORT_NAMES, &["rr"]);
        assert!(Recommendation::NAMESPACED);
    }

    #[test]
    fn recommendation_rule_spec_from_yaml() {
        let spec: RecommendationRuleSpec = parse_spec(
            r#"
runInterval: 24h
resourceSelectors:
  - kind: Deployment
    apiVersion: apps/v1
namespaceSelector:
  any: true
recommenders:
  - name: Replicas
  - name: Resource
    config:
      cpu-request-percentile: "0.98"
"#,
        );
        assert!(spec.namespace_selector.matches("anything"));
        assert_eq!(spec.recommenders().len(), 2);
        assert_eq!(spec.recommenders()[1].config["cpu-request-percentile"], "0.98");

        let status = RecommendationRuleStatus::default();
        assert_eq!(serde_json::to_value(&status).unwrap(), json!({}));
    }

    #[test]
    fn unset_recommenders_stay_null() {
        let wire = json!({
            "resourceSelectors": [{"kind": "Deployment", "apiVersion": "apps/v1"}],
            "namespaceSelector": {"any": true},
            "recommenders": null
        });
        let spec: RecommendationRuleSpec = serde_json::from_value(wire).unwrap();
        assert!(spec.recommenders.is_none());
        assert!(spec.recommenders().is_empty());
        assert_eq!(serde_json::to_value(&spec).unwrap()["recommenders"], json!(null));

        let empty = RecommendationRuleSpec {
            recommenders: Some(Vec::new()),
            ..spec
        };
        assert_eq!(serde_json::to_value(&empty).unwrap()["recommenders"], json!([]));
    }

    #[test]
    fn namespace_selector_match_names() {
        let selector = NamespaceSelector {
            any: false,
            match_names: vec!["default".into(), "prod".into()],
        };
        assert!(selector.matches("prod"));
        assert!(!selector.matches("kube-system"));
        assert!(!NamespaceSelector::default().matches("default"));
    }

    #[test]
    fn config_set_keeps_fields_at_top_level() {
        let set: ConfigSet = serde_json::from_value(json!({
            "apiVersion": "analysis.crane.io/v1alpha1",
            "kind": "ConfigSet",
            "metadata": {"name": "recommendation-configuration", "namespace": "crane-system"},
            "configs": [
                {"properties": {"cpu-request-percentile": "0.95"}},
                {
                    "targets": [{"namespace": "prod", "kind": "Deployment"}],
                    "properties": {"cpu-request-percentile": "0.99", "ehpa.max-replicas-factor": "3"}
                }
            ]
        }))
        .unwrap();

        assert_eq!(set.types.as_ref().unwrap().kind, "ConfigSet");
        let prod = set.properties_for("prod", "Deployment", "api");
        assert_eq!(prod["cpu-request-percentile"], "0.99");
        assert_eq!(prod["ehpa.max-replicas-factor"], "3");

        let dev = set.properties_for("dev", "Deployment", "api");
        assert_eq!(dev["cpu-request-percentile"], "0.95");
        assert!(!dev.contains_key("ehpa.max-replicas-factor"));

        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["apiVersion"], "analysis.crane.io/v1alpha1");
        assert!(value.get("spec").is_none());
    }

    #[test]
    fn config_set_constructor_sets_type_meta() {
        let set = ConfigSet::new("defaults", vec![]);
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["kind"], "ConfigSet");
        assert_eq!(value["metadata"]["name"], "defaults");
        assert!(value.get("configs").is_none());
    }

    #[test]
    fn resource_patch_from_recommendation() {
        let recommendation = ResourceRequestRecommendation {
            containers: vec![ContainerRecommendation {
                container_name: "nginx".into(),
                target: BTreeMap::from([
                    ("cpu".to_string(), "250m".to_string()),
                    ("memory".to_string(), "128Mi".to_string()),
                ]),
            }],
        };
        let patch = PatchResource::from(&recommendation);
        let value = serde_json::to_value(&patch).unwrap();
        let container = &value["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["name"], "nginx");
        assert_eq!(container["resources"]["requests"]["cpu"], "250m");

        assert_eq!(
            serde_json::to_value(PatchReplicas::new(4)).unwrap(),
            json!({"spec": {"replicas": 4}})
        );
    }

    #[test]
    fn proposed_recommendation_uses_wire_names() {
        let proposed = ProposedRecommendation {
            effective_hpa: Some(EffectiveHorizontalPodAutoscalerRecommendation {
                min_replicas: Some(2),
                max_replicas: Some(10),
                ..Default::default()
            }),
            replicas_recommendation: Some(ReplicasRecommendation { replicas: Some(3) }),
            resource_request: None,
        };
        let value = serde_json::to_value(&proposed).unwrap();
        assert_eq!(value["effectiveHPA"]["minReplicas"], 2);
        assert_eq!(value["replicasRecommendation"]["replicas"], 3);
        assert!(value.get("resourceRequest").is_none());
    }

    #[test]
    fn deep_copy_does_not_alias() {
        let mut spec = AnalyticsSpec {
            type_: AnalysisType::Resource,
            resource_selectors: vec![ResourceSelector {
                kind: "Deployment".into(),
                api_version: "apps/v1".into(),
                ..Default::default()
            }],
            completion_strategy: CompletionStrategy::once(),
            config: BTreeMap::from([("k".to_string(), "v".to_string())]),
        };
        let original = Analytics::new("a", spec.clone());
        let mut copy = original.clone();

        copy.spec.resource_selectors[0].name = "changed".into();
        copy.spec.config.insert("k2".into(), "v2".into());
        assert_eq!(original.spec.resource_selectors[0].name, "");
        assert_eq!(original.spec.config.len(), 1);

        spec.config.clear();
        assert_eq!(original.spec.config.len(), 1);
    }
}

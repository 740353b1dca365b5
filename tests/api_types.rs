//! Wire format of the Crane kinds

use std::collections::BTreeMap;

use crane_api::CraneObject;
use crane_api::apis::analysis::{
    AdoptionType, AnalysisType, CompletionStrategy, CompletionStrategyType, ConfigSet, ConfigSetConfig,
    Recommendation, RecommendationSpec, Target,
};
use crane_api::apis::co2e::{
    CloudCarbonFootprint, CloudCarbonFootprintSpec, ComputeConfig, NetworkingConfig, PROVIDER_MANUAL,
    StorageConfig,
};
use crane_api::apis::ensurance::NodeQOS;
use crane_api::apis::prediction::TimeSeriesPrediction;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use serde_json::json;

fn shanghai_footprint() -> CloudCarbonFootprint {
    CloudCarbonFootprint::new(
        "carbon-footprint-shanghai-dc",
        CloudCarbonFootprintSpec {
            provider: PROVIDER_MANUAL.into(),
            region: "shanghai".into(),
            zone: "china-shanghai-az01".into(),
            locality: "AP/China/Shanghai/AZ01".into(),
            pue: "1.5".into(),
            emission_factor: "0.5810".into(),
            compute_config: vec![ComputeConfig {
                node_selector: Some(LabelSelector {
                    match_labels: Some(BTreeMap::from([(
                        "topology.kubernetes.io/zone".to_string(),
                        "shanghai-zone-01".to_string(),
                    )])),
                    ..Default::default()
                }),
                min_watts_per_cpu: "0.743".into(),
                max_watts_per_cpu: "3.84".into(),
                memory_watts_per_gb: "0.65".into(),
                ..Default::default()
            }],
            storage_config: vec![StorageConfig {
                storage_class: "cloudBlockDevice".into(),
                watts_per_tb: "1.2".into(),
            }],
            networking_config: vec![NetworkingConfig {
                networking_class: "golden".into(),
                watts_per_gb: "0.65".into(),
            }],
        },
    )
}

#[test]
fn carbon_footprint_wire_format() {
    let ccf = shanghai_footprint();
    let value = serde_json::to_value(&ccf).unwrap();

    assert_eq!(value["apiVersion"], "co2e.gocrane.io/v1alpha1");
    assert_eq!(value["kind"], "CloudCarbonFootprint");
    assert_eq!(value["spec"]["pue"], "1.5");
    assert_eq!(value["spec"]["emissionFactor"], "0.5810");
    assert_eq!(value["spec"]["computeConfig"][0]["minWattsPerCPU"], "0.743");
    assert_eq!(value["spec"]["computeConfig"][0]["memoryWattsPerGB"], "0.65");
    assert_eq!(
        value["spec"]["computeConfig"][0]["nodeSelector"]["matchLabels"]["topology.kubernetes.io/zone"],
        "shanghai-zone-01"
    );
    assert_eq!(value["spec"]["storageConfig"][0]["wattsPerTB"], "1.2");
    assert_eq!(value["spec"]["networkingConfig"][0]["storageClass"], "golden");
    assert!(value["spec"]["computeConfig"][0].get("cpuEnergyConsumptionRatio").is_none());

    let back: CloudCarbonFootprint = serde_json::from_value(value).unwrap();
    assert_eq!(back, ccf);
    assert!(back.spec.is_manual());
}

#[test]
fn clones_do_not_alias() {
    let original = shanghai_footprint();
    let mut copy = original.clone();
    copy.spec.compute_config[0].max_watts_per_cpu = "9.9".into();
    copy.spec
        .compute_config[0]
        .node_selector
        .as_mut()
        .and_then(|s| s.match_labels.as_mut())
        .unwrap()
        .insert("extra".into(), "label".into());
    copy.metadata.labels = Some(BTreeMap::from([("copied".to_string(), "yes".to_string())]));

    assert_eq!(original.spec.compute_config[0].max_watts_per_cpu, "3.84");
    assert_eq!(
        original.spec.compute_config[0]
            .node_selector
            .as_ref()
            .and_then(|s| s.match_labels.as_ref())
            .map(|l| l.len()),
        Some(1)
    );
    assert!(original.metadata.labels.is_none());
    assert_ne!(original, copy);
}

#[test]
fn recommendation_yaml_round_trip() {
    let yaml = r#"
apiVersion: analysis.crane.io/v1alpha1
kind: Recommendation
metadata:
  name: nginx-resource
  namespace: default
spec:
  targetRef:
    apiVersion: apps/v1
    kind: Deployment
    name: nginx
    namespace: default
  type: Resource
  completionStrategy:
    completionStrategyType: Periodical
    periodSeconds: 86400
  adoptionType: StatusAndAnnotation
status:
  recommendedValue: |
    resourceRequest:
      containers:
      - containerName: nginx
        target:
          cpu: 100m
  conditions:
  - type: Ready
    status: "True"
    reason: RecommendationReady
    message: ok
    lastTransitionTime: "2024-05-01T08:00:00Z"
"#;
    let rec: Recommendation = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(rec.spec.type_, AnalysisType::Resource);
    assert_eq!(rec.spec.completion_strategy.strategy_type(), CompletionStrategyType::Periodical);
    assert_eq!(rec.spec.adoption_type, Some(AdoptionType::StatusAndAnnotation));
    let status = rec.status.as_ref().unwrap();
    assert_eq!(status.conditions.len(), 1);

    let reparsed: Recommendation = serde_yaml::from_str(&serde_yaml::to_string(&rec).unwrap()).unwrap();
    assert_eq!(reparsed, rec);
}

#[test]
fn unknown_enum_values_are_rejected() {
    let spec = json!({
        "targetRef": {"kind": "Deployment", "name": "nginx"},
        "type": "Cost"
    });
    assert!(serde_json::from_value::<RecommendationSpec>(spec).is_err());

    let built = RecommendationSpec {
        target_ref: ObjectReference {
            kind: Some("Deployment".into()),
            name: Some("nginx".into()),
            ..Default::default()
        },
        type_: AnalysisType::Replicas,
        completion_strategy: CompletionStrategy::once(),
        adoption_type: None,
    };
    let value = serde_json::to_value(&built).unwrap();
    assert_eq!(value["type"], "Replicas");
    assert!(value.get("adoptionType").is_none());
}

#[test]
fn config_set_fields_sit_at_top_level() {
    let mut web = BTreeMap::new();
    web.insert("cpu-request-percentile".to_string(), "0.95".to_string());
    let set = ConfigSet::new(
        "defaults",
        vec![ConfigSetConfig {
            targets: vec![Target {
                namespace: "default".into(),
                ..Default::default()
            }],
            properties: web,
        }],
    );

    let value = serde_json::to_value(&set).unwrap();
    assert_eq!(value["kind"], "ConfigSet");
    assert_eq!(value["configs"][0]["targets"][0]["namespace"], "default");
    assert!(value.get("spec").is_none());

    assert_eq!(
        set.properties_for("default", "Deployment", "web").get("cpu-request-percentile").map(String::as_str),
        Some("0.95")
    );
    assert!(set.properties_for("prod", "Deployment", "web").is_empty());
}

#[test]
fn scope_registration() {
    assert!(Recommendation::NAMESPACED);
    assert!(TimeSeriesPrediction::NAMESPACED);
    assert!(!NodeQOS::NAMESPACED);
    assert!(!CloudCarbonFootprint::NAMESPACED);
    assert_eq!(NodeQOS::SHORT_NAMES, &["nqos"]);
    assert_eq!(ConfigSet::resource_name(), "configsets");
}

//! CustomResourceDefinition generation for every Crane kind.
//!
//! Kinds with a spec get their definition from the `CustomResource` derive.
//! ConfigSet and NodeResourceTopology keep their fields at the top level, so
//! their definitions are assembled here from the `JsonSchema` of the type.

use std::fs;
use std::path::{Path, PathBuf};

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceColumnDefinition, CustomResourceDefinition, CustomResourceDefinitionNames,
    CustomResourceDefinitionSpec, CustomResourceDefinitionVersion, CustomResourceValidation,
    JSONSchemaProps,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResourceExt;
use log::{debug, info};
use schemars::JsonSchema;
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
use crate::lib::object::CraneObject;
use crate::{ConfigError, CraneError, Result};

/// Every Crane CRD, grouped by API group
pub fn all() -> Result<Vec<CustomResourceDefinition>> {
    Ok(vec![
        Recommendation::crd(),
        Analytics::crd(),
        top_level_crd::<ConfigSet>(vec![column("AGE", "date", ".metadata.creationTimestamp")])?,
        RecommendationRule::crd(),
        EffectiveHorizontalPodAutoscaler::crd(),
        EffectiveVerticalPodAutoscaler::crd(),
        PodQOS::crd(),
        NodeQOS::crd(),
        AvoidanceAction::crd(),
        PodQOSEnsurancePolicy::crd(),
        NodeQOSEnsurancePolicy::crd(),
        TimeSeriesPrediction::crd(),
        PodGroupPrediction::crd(),
        NodePrediction::crd(),
        ClusterNodePrediction::crd(),
        top_level_crd::<NodeResourceTopology>(vec![
            column(
                "CRANE CPU MANAGER POLICY",
                "string",
                ".craneManagerPolicy.cpuManagerPolicy",
            ),
            column(
                "CRANE TOPOLOGY MANAGER POLICY",
                "string",
                ".craneManagerPolicy.topologyManagerPolicy",
            ),
            column("AGE", "date", ".metadata.creationTimestamp"),
        ])?,
        CloudCarbonFootprint::crd(),
    ])
}

/// Render definitions as one multi-document YAML stream
pub fn to_yaml(crds: &[CustomResourceDefinition]) -> Result<String> {
    let mut out = String::new();
    for crd in crds {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(crd)?);
    }
    Ok(out)
}

/// Write one `<group>_<plural>.yaml` file per definition into `dir`
pub fn write_all(dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| {
        ConfigError::FileError(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    let mut written = Vec::new();
    for crd in all()? {
        let path = dir.join(file_name(&crd));
        fs::write(&path, serde_yaml::to_string(&crd)?)?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }

    info!("Wrote {} CRDs to {}", written.len(), dir.display());
    Ok(written)
}

pub fn file_name(crd: &CustomResourceDefinition) -> String {
    format!("{}_{}.yaml", crd.spec.group, crd.spec.names.plural)
}

fn column(name: &str, type_: &str, json_path: &str) -> CustomResourceColumnDefinition {
    CustomResourceColumnDefinition {
        name: name.to_string(),
        type_: type_.to_string(),
        json_path: json_path.to_string(),
        ..Default::default()
    }
}

fn top_level_crd<K>(columns: Vec<CustomResourceColumnDefinition>) -> Result<CustomResourceDefinition>
where
    K: CraneObject + JsonSchema,
{
    let kind = K::kind_name();
    let plural = K::resource_name();
    let group = K::group(&()).into_owned();

    let versions = vec![CustomResourceDefinitionVersion {
        name: K::version(&()).into_owned(),
        served: true,
        storage: true,
        schema: Some(CustomResourceValidation {
            open_api_v3_schema: Some(object_schema::<K>()?),
        }),
        additional_printer_columns: (!columns.is_empty()).then_some(columns),
        ..Default::default()
    }];

    Ok(CustomResourceDefinition {
        metadata: ObjectMeta {
            name: Some(format!("{plural}.{group}")),
            ..Default::default()
        },
        spec: CustomResourceDefinitionSpec {
            group,
            names: CustomResourceDefinitionNames {
                kind: kind.clone(),
                list_kind: Some(format!("{kind}List")),
                plural,
                singular: Some(kind.to_lowercase()),
                short_names: (!K::SHORT_NAMES.is_empty())
                    .then(|| K::SHORT_NAMES.iter().map(|s| s.to_string()).collect()),
                ..Default::default()
            },
            scope: if K::NAMESPACED { "Namespaced" } else { "Cluster" }.to_string(),
            versions,
            ..Default::default()
        },
        status: None,
    })
}

/// OpenAPI v3 schema of a whole object, with type and object metadata left to
/// the API server
fn object_schema<K: JsonSchema>() -> Result<JSONSchemaProps> {
    let generator = schemars::generate::SchemaSettings::openapi3()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator();
    let schema = generator.into_root_schema_for::<K>();

    let mut value = serde_json::to_value(schema)?;
    let Value::Object(root) = &mut value else {
        return Err(CraneError::Invalid("schema root is not an object".into()));
    };
    for key in ["$schema", "title", "definitions", "$defs", "description"] {
        root.remove(key);
    }
    if let Some(Value::Object(properties)) = root.get_mut("properties") {
        properties.insert("apiVersion".into(), json!({"type": "string"}));
        properties.insert("kind".into(), json!({"type": "string"}));
        properties.insert("metadata".into(), json!({"type": "object"}));
    }
    if let Some(Value::Array(required)) = root.get_mut("required") {
        required.retain(|r| r != "metadata");
    }

    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(crds: &'a [CustomResourceDefinition], plural: &str) -> &'a CustomResourceDefinition {
        crds.iter()
            .find(|c| c.spec.names.plural == plural)
            .unwrap_or_else(|| panic!("no CRD for {plural}"))
    }

    #[test]
    fn every_kind_has_a_definition() {
        let crds = all().unwrap();
        assert_eq!(crds.len(), 17);

        let mut names: Vec<_> = crds.iter().filter_map(|c| c.metadata.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 17);
    }

    #[test]
    fn top_level_kinds_have_no_spec_property() {
        let crds = all().unwrap();
        let nrt = find(&crds, "noderesourcetopologies");
        assert_eq!(nrt.metadata.name.as_deref(), Some("noderesourcetopologies.topology.crane.io"));
        assert_eq!(nrt.spec.scope, "Cluster");
        assert_eq!(nrt.spec.names.short_names, Some(vec!["nrt".to_string()]));
        assert_eq!(nrt.spec.names.list_kind.as_deref(), Some("NodeResourceTopologyList"));

        let version = &nrt.spec.versions[0];
        let schema = version
            .schema
            .as_ref()
            .and_then(|s| s.open_api_v3_schema.as_ref())
            .unwrap();
        let properties = schema.properties.as_ref().unwrap();
        assert!(properties.contains_key("craneManagerPolicy"));
        assert!(properties.contains_key("zones"));
        assert!(properties.contains_key("metadata"));
        assert!(!properties.contains_key("spec"));
        assert!(!properties.contains_key("types"));
        assert_eq!(version.additional_printer_columns.as_ref().unwrap().len(), 3);

        let config_set = find(&crds, "configsets");
        assert_eq!(config_set.spec.scope, "Namespaced");
        assert_eq!(config_set.spec.group, "analysis.crane.io");
    }

    #[test]
    fn derived_kinds_keep_identity() {
        let crds = all().unwrap();
        let ehpa = find(&crds, "effectivehorizontalpodautoscalers");
        assert_eq!(ehpa.spec.group, "autoscaling.crane.io");
        assert_eq!(ehpa.spec.names.kind, "EffectiveHorizontalPodAutoscaler");
        assert_eq!(ehpa.spec.names.short_names, Some(vec!["ehpa".to_string()]));
        assert!(ehpa.spec.versions[0].subresources.is_some());

        let ccf = find(&crds, "cloudcarbonfootprints");
        assert_eq!(ccf.spec.group, "co2e.gocrane.io");
        assert_eq!(ccf.spec.scope, "Cluster");
    }

    #[test]
    fn yaml_stream_and_files() {
        let crds = all().unwrap();
        let yaml = to_yaml(&crds).unwrap();
        assert_eq!(yaml.matches("---\n").count(), crds.len());

        let dir = tempfile::tempdir().unwrap();
        let written = write_all(dir.path()).unwrap();
        assert_eq!(written.len(), crds.len());
        assert!(dir.path().join("analysis.crane.io_recommendations.yaml").exists());
        assert!(dir.path().join("co2e.gocrane.io_cloudcarbonfootprints.yaml").exists());
    }
}

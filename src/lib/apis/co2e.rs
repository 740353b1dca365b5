//! `co2e.gocrane.io/v1alpha1`: carbon footprint coefficients of a datacenter.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, LabelSelector};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::lib::object::crane_object;

pub const GROUP: &str = "co2e.gocrane.io";
pub const VERSION: &str = "v1alpha1";

/// Every coefficient is configured by hand
pub const PROVIDER_MANUAL: &str = "Manual";

/// CloudCarbonFootprint holds the power and emission coefficients used to
/// estimate the carbon footprint of workloads.
///
/// Numbers are decimal strings.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "co2e.gocrane.io",
    version = "v1alpha1",
    kind = "CloudCarbonFootprint",
    plural = "cloudcarbonfootprints",
    shortname = "ccf",
    status = "CloudCarbonFootprintStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct CloudCarbonFootprintSpec {
    /// `Manual`, or a cloud provider whose controller fills the coefficients
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub zone: String,

    /// e.g. `ap/china/shanghai/az01/floor3`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub locality: String,

    /// Power usage effectiveness
    #[serde(rename = "pue", default, skip_serializing_if = "String::is_empty")]
    pub pue: String,

    /// tCO2/MWh
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub emission_factor: String,

    /// One entry per node type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compute_config: Vec<ComputeConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_config: Vec<StorageConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networking_config: Vec<NetworkingConfig>,
}

impl CloudCarbonFootprintSpec {
    pub fn is_manual(&self) -> bool {
        self.provider == PROVIDER_MANUAL
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComputeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<LabelSelector>,

    /// Idle power
    #[serde(rename = "minWattsPerCPU", default, skip_serializing_if = "String::is_empty")]
    pub min_watts_per_cpu: String,

    /// Power at full utilization
    #[serde(rename = "maxWattsPerCPU", default, skip_serializing_if = "String::is_empty")]
    pub max_watts_per_cpu: String,

    /// Share of all IT equipment energy spent by cpus
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpu_energy_consumption_ratio: String,

    #[serde(rename = "memoryWattsPerGB", default, skip_serializing_if = "String::is_empty")]
    pub memory_watts_per_gb: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_class: String,

    #[serde(rename = "wattsPerTB", default, skip_serializing_if = "String::is_empty")]
    pub watts_per_tb: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct NetworkingConfig {
    /// Redundancy class of the links, e.g. golden. Stored under `storageClass`.
    #[serde(rename = "storageClass", default, skip_serializing_if = "String::is_empty")]
    pub networking_class: String,

    #[serde(rename = "wattsPerGB", default, skip_serializing_if = "String::is_empty")]
    pub watts_per_gb: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CloudCarbonFootprintStatus {
    #[serde(rename = "condition", default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

crane_object!(CloudCarbonFootprint, cluster, ["ccf"]);

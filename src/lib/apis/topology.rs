//! `topology.crane.io/v1alpha1`: node resource topology.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::TypeMeta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::lib::object::{crane_object, is_zero};

pub const GROUP: &str = "topology.crane.io";
pub const VERSION: &str = "v1alpha1";

/// Pod annotation selecting the cpu policy
pub const ANNOTATION_POD_CPU_POLICY_KEY: &str = "topology.crane.io/cpu-policy";
/// Pod annotation selecting topology awareness
pub const ANNOTATION_POD_TOPOLOGY_AWARENESS_KEY: &str = "topology.crane.io/topology-awareness";
/// Pod annotation written by the scheduler with the chosen zones
pub const ANNOTATION_POD_TOPOLOGY_RESULT_KEY: &str = "topology.crane.io/topology-result";
pub const ANNOTATION_POD_EXCLUDE_RESERVED_CPUS: &str = "topology.crane.io/exclude-reserved-cpus";

/// Use the default cpuset
pub const ANNOTATION_POD_CPU_POLICY_NONE: &str = "none";
/// Never share a cpuset with other pods
pub const ANNOTATION_POD_CPU_POLICY_EXCLUSIVE: &str = "exclusive";
/// Default cpuset restricted to one NUMA node
pub const ANNOTATION_POD_CPU_POLICY_NUMA: &str = "numa";
/// Part of the default cpuset, pinned to avoid context switches
pub const ANNOTATION_POD_CPU_POLICY_IMMOVABLE: &str = "immovable";

/// Node label holding the default topology awareness of the node
pub const LABEL_NODE_TOPOLOGY_AWARENESS_KEY: &str = "topology.crane.io/topology-awareness";

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum CPUManagerPolicy {
    #[default]
    None,
    Static,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum TopologyManagerPolicy {
    None,
    /// Pod level accounting; assumes the kubelet runs single-numa-node
    #[default]
    SingleNUMANodePodLevel,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ZoneType {
    Node,
    Socket,
    Core,
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneType::Node => write!(f, "Node"),
            ZoneType::Socket => write!(f, "Socket"),
            ZoneType::Core => write!(f, "Core"),
        }
    }
}

/// NodeResourceTopology describes the resources of a node and their NUMA
/// layout. Its fields sit beside the metadata rather than under a spec.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeResourceTopology {
    #[serde(flatten, default)]
    #[schemars(skip)]
    pub types: Option<TypeMeta>,

    #[serde(default)]
    pub metadata: ObjectMeta,

    pub crane_manager_policy: ManagerPolicy,

    /// Reserved for system and kubernetes components
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reserved: BTreeMap<String, Quantity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<Zone>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl NodeResourceTopology {
    pub fn new(node: &str, crane_manager_policy: ManagerPolicy) -> Self {
        Self {
            types: Some(TypeMeta {
                api_version: <Self as k8s_openapi::Resource>::API_VERSION.to_string(),
                kind: <Self as k8s_openapi::Resource>::KIND.to_string(),
            }),
            metadata: ObjectMeta {
                name: Some(node.to_string()),
                ..Default::default()
            },
            crane_manager_policy,
            ..Default::default()
        }
    }

    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }

    /// Direct children of a zone in the zone tree
    pub fn children<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a Zone> + 'a {
        self.zones.iter().filter(move |z| z.parent == parent)
    }

    /// Cost between two zones as recorded on the first one
    pub fn cost(&self, from: &str, to: &str) -> Option<i64> {
        self.zone(from)?
            .costs
            .iter()
            .find(|c| c.name == to)
            .map(|c| c.value)
    }
}

impl k8s_openapi::Resource for NodeResourceTopology {
    const API_VERSION: &'static str = "topology.crane.io/v1alpha1";
    const GROUP: &'static str = GROUP;
    const KIND: &'static str = "NodeResourceTopology";
    const VERSION: &'static str = VERSION;
    const URL_PATH_SEGMENT: &'static str = "noderesourcetopologies";
    type Scope = k8s_openapi::ClusterResourceScope;
}

impl k8s_openapi::Metadata for NodeResourceTopology {
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
pub struct ManagerPolicy {
    #[serde(rename = "cpuManagerPolicy")]
    pub cpu_manager_policy: CPUManagerPolicy,

    /// Required on the wire; `ManagerPolicy::default()` uses SingleNUMANodePodLevel
    pub topology_manager_policy: TopologyManagerPolicy,
}

/// A node in the zone tree: a NUMA node, socket or core
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub name: String,

    #[serde(rename = "type")]
    pub type_: ZoneType,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub costs: Vec<CostInfo>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceInfo>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capacity: BTreeMap<String, Quantity>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub allocatable: BTreeMap<String, Quantity>,

    /// CPUs reserved for host and kubernetes threads
    #[serde(rename = "reservedCPUNums", default, skip_serializing_if = "is_zero")]
    pub reserved_cpu_nums: i32,
}

/// Distance from the owning zone to the named one
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CostInfo {
    pub name: String,
    pub value: i64,
}

crane_object!(NodeResourceTopology, cluster, ["nrt"]);

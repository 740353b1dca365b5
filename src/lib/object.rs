//! Runtime identity shared by every Crane kind, plus the generic list wrapper.

use std::fmt::Debug;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ListMeta;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A Crane custom resource kind with a static API identity
pub trait CraneObject:
    Resource<DynamicType = ()> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Whether objects of this kind live inside a namespace
    const NAMESPACED: bool;

    /// kubectl short names registered for this kind
    const SHORT_NAMES: &'static [&'static str];

    /// Plural resource name used in REST paths and not-found errors
    fn resource_name() -> String {
        <Self as Resource>::plural(&()).into_owned()
    }

    fn kind_name() -> String {
        <Self as Resource>::kind(&()).into_owned()
    }

    /// API handle scoped to `namespace`, or to all namespaces when `None`.
    /// Cluster scoped kinds ignore the namespace.
    fn api(client: kube::Client, namespace: Option<&str>) -> kube::Api<Self>;
}

/// Register a kind's scope and short names
macro_rules! crane_object {
    ($kind:ty, namespaced, [$($short:literal),* $(,)?]) => {
        impl $crate::lib::object::CraneObject for $kind {
            const NAMESPACED: bool = true;
            const SHORT_NAMES: &'static [&'static str] = &[$($short),*];

            fn api(client: kube::Client, namespace: Option<&str>) -> kube::Api<Self> {
                match namespace {
                    Some(ns) => kube::Api::namespaced(client, ns),
                    None => kube::Api::all(client),
                }
            }
        }
    };
    ($kind:ty, cluster, [$($short:literal),* $(,)?]) => {
        impl $crate::lib::object::CraneObject for $kind {
            const NAMESPACED: bool = false;
            const SHORT_NAMES: &'static [&'static str] = &[$($short),*];

            fn api(client: kube::Client, _namespace: Option<&str>) -> kube::Api<Self> {
                kube::Api::all(client)
            }
        }
    };
}
pub(crate) use crane_object;

/// `{apiVersion, kind, metadata, items}` wrapper for a kind
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList<K> {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ListMeta,
    pub items: Vec<K>,
}

impl<K: CraneObject> ResourceList<K> {
    pub fn new(metadata: ListMeta, items: Vec<K>) -> Self {
        Self {
            api_version: K::api_version(&()).into_owned(),
            kind: format!("{}List", K::kind(&())),
            metadata,
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<K> IntoIterator for ResourceList<K> {
    type Item = K;
    type IntoIter = std::vec::IntoIter<K>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

pub(crate) fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

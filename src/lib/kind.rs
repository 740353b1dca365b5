use std::fmt;
use std::str::FromStr;

use crate::lib::object::CraneObject;

/// Every Crane kind, as selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    // analysis.crane.io
    Recommendation,
    Analytics,
    ConfigSet,
    RecommendationRule,

    // autoscaling.crane.io
    EffectiveHorizontalPodAutoscaler,
    EffectiveVerticalPodAutoscaler,

    // ensurance.crane.io
    PodQOS,
    NodeQOS,
    AvoidanceAction,
    PodQOSEnsurancePolicy,
    NodeQOSEnsurancePolicy,

    // prediction.crane.io
    TimeSeriesPrediction,
    PodGroupPrediction,
    NodePrediction,
    ClusterNodePrediction,

    // topology.crane.io
    NodeResourceTopology,

    // co2e.gocrane.io
    CloudCarbonFootprint,
}

/// Evaluate `$body` with `$K` bound to the Rust type of `$kind`
macro_rules! with_kind {
    ($kind:expr, $K:ident => $body:expr) => {{
        use $crate::lib::apis::{analysis, autoscaling, co2e, ensurance, prediction, topology};
        use $crate::lib::kind::ResourceKind as RK;
        match $kind {
            RK::Recommendation => { type $K = analysis::Recommendation; $body }
            RK::Analytics => { type $K = analysis::Analytics; $body }
            RK::ConfigSet => { type $K = analysis::ConfigSet; $body }
            RK::RecommendationRule => { type $K = analysis::RecommendationRule; $body }
            RK::EffectiveHorizontalPodAutoscaler => {
                type $K = autoscaling::EffectiveHorizontalPodAutoscaler;
                $body
            }
            RK::EffectiveVerticalPodAutoscaler => {
                type $K = autoscaling::EffectiveVerticalPodAutoscaler;
                $body
            }
            RK::PodQOS => { type $K = ensurance::PodQOS; $body }
            RK::NodeQOS => { type $K = ensurance::NodeQOS; $body }
            RK::AvoidanceAction => { type $K = ensurance::AvoidanceAction; $body }
            RK::PodQOSEnsurancePolicy => { type $K = ensurance::PodQOSEnsurancePolicy; $body }
            RK::NodeQOSEnsurancePolicy => { type $K = ensurance::NodeQOSEnsurancePolicy; $body }
            RK::TimeSeriesPrediction => { type $K = prediction::TimeSeriesPrediction; $body }
            RK::PodGroupPrediction => { type $K = prediction::PodGroupPrediction; $body }
            RK::NodePrediction => { type $K = prediction::NodePrediction; $body }
            RK::ClusterNodePrediction => { type $K = prediction::ClusterNodePrediction; $body }
            RK::NodeResourceTopology => { type $K = topology::NodeResourceTopology; $body }
            RK::CloudCarbonFootprint => { type $K = co2e::CloudCarbonFootprint; $body }
        }
    }};
}
pub(crate) use with_kind;

impl ResourceKind {
    pub const ALL: [ResourceKind; 17] = [
        ResourceKind::Recommendation,
        ResourceKind::Analytics,
        ResourceKind::ConfigSet,
        ResourceKind::RecommendationRule,
        ResourceKind::EffectiveHorizontalPodAutoscaler,
        ResourceKind::EffectiveVerticalPodAutoscaler,
        ResourceKind::PodQOS,
        ResourceKind::NodeQOS,
        ResourceKind::AvoidanceAction,
        ResourceKind::PodQOSEnsurancePolicy,
        ResourceKind::NodeQOSEnsurancePolicy,
        ResourceKind::TimeSeriesPrediction,
        ResourceKind::PodGroupPrediction,
        ResourceKind::NodePrediction,
        ResourceKind::ClusterNodePrediction,
        ResourceKind::NodeResourceTopology,
        ResourceKind::CloudCarbonFootprint,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Recommendation => "Recommendation",
            ResourceKind::Analytics => "Analytics",
            ResourceKind::ConfigSet => "ConfigSet",
            ResourceKind::RecommendationRule => "RecommendationRule",
            ResourceKind::EffectiveHorizontalPodAutoscaler => "EffectiveHorizontalPodAutoscaler",
            ResourceKind::EffectiveVerticalPodAutoscaler => "EffectiveVerticalPodAutoscaler",
            ResourceKind::PodQOS => "PodQOS",
            ResourceKind::NodeQOS => "NodeQOS",
            ResourceKind::AvoidanceAction => "AvoidanceAction",
            ResourceKind::PodQOSEnsurancePolicy => "PodQOSEnsurancePolicy",
            ResourceKind::NodeQOSEnsurancePolicy => "NodeQOSEnsurancePolicy",
            ResourceKind::TimeSeriesPrediction => "TimeSeriesPrediction",
            ResourceKind::PodGroupPrediction => "PodGroupPrediction",
            ResourceKind::NodePrediction => "NodePrediction",
            ResourceKind::ClusterNodePrediction => "ClusterNodePrediction",
            ResourceKind::NodeResourceTopology => "NodeResourceTopology",
            ResourceKind::CloudCarbonFootprint => "CloudCarbonFootprint",
        }
    }

    pub fn plural(&self) -> String {
        with_kind!(self, K => K::resource_name())
    }

    pub fn short_names(&self) -> &'static [&'static str] {
        with_kind!(self, K => <K as CraneObject>::SHORT_NAMES)
    }

    pub fn group(&self) -> String {
        with_kind!(self, K => <K as kube::Resource>::group(&()).into_owned())
    }

    pub fn namespaced(&self) -> bool {
        with_kind!(self, K => <K as CraneObject>::NAMESPACED)
    }

    fn answers_to(&self, name: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(name)
            || self.plural().eq_ignore_ascii_case(name)
            || self.short_names().iter().any(|s| s.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    /// Accepts the kind, its plural or a short name, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.answers_to(name))
            .ok_or_else(|| {
                format!(
                    "Unknown resource kind: '{}'. Run `cranectl crds` to see every Crane kind",
                    s
                )
            })
    }
}

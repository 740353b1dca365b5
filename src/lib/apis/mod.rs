//! Custom resource types, one module per API group.

pub mod analysis;
pub mod autoscaling;
pub mod co2e;
pub mod ensurance;
pub mod prediction;
pub mod topology;

/// Every API group served by Crane, as `(group, version)`
pub const GROUP_VERSIONS: [(&str, &str); 6] = [
    (analysis::GROUP, analysis::VERSION),
    (autoscaling::GROUP, autoscaling::VERSION),
    (ensurance::GROUP, ensurance::VERSION),
    (prediction::GROUP, prediction::VERSION),
    (topology::GROUP, topology::VERSION),
    (co2e::GROUP, co2e::VERSION),
];

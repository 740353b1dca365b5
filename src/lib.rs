//! Crane custom resource API
//!
//! Typed definitions for the Crane API groups (analysis, autoscaling,
//! ensurance, prediction, topology, co2e), their CustomResourceDefinitions,
//! typed clients with an in-memory fake, informers and listers.

pub mod lib {
    pub mod apis;
    pub mod cli;
    pub mod client;
    pub mod commands;
    pub mod config;
    pub mod crd;
    pub mod error;
    pub mod fake;
    pub mod informer;
    pub mod kind;
    pub mod kubernetes;
    pub mod lister;
    pub mod logger;
    pub mod object;
    pub mod output;
    pub mod selector;
    pub mod tui;
}

// Re-export commonly used types at the root level for convenience
pub use lib::apis;
pub use lib::cli::{Cli, Command, OutputFormat};
pub use lib::client::{Clientset, ListOptions, Patch, ResourceClient, WatchEvent};
pub use lib::commands::run;
pub use lib::config::Config;
pub use lib::error::{ConfigError, CraneError, KubernetesError, Result, SelectorError};
pub use lib::fake::{FakeClient, FakeTrackers, ObjectTracker};
pub use lib::informer::{HandlerFuncs, Informer, ResourceEventHandler, SharedInformerFactory};
pub use lib::kind::ResourceKind;
pub use lib::lister::{Lister, NamespaceLister};
pub use lib::logger::init_logger;
pub use lib::object::{CraneObject, ResourceList};
pub use lib::selector::{Operator, Requirement, Selector};

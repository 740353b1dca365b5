use thiserror::Error;

/// Main error type for the crane API crate
#[derive(Error, Debug)]
pub enum CraneError {
    /// Kubernetes API errors
    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] KubernetesError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Label selector errors
    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),

    /// Object does not exist, keyed by plural resource and name
    #[error("{resource} \"{name}\" not found")]
    NotFound { resource: String, name: String },

    /// Object with the same identity already exists
    #[error("{resource} \"{name}\" already exists")]
    AlreadyExists { resource: String, name: String },

    /// Write rejected because the stored object changed
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object or request rejected as invalid
    #[error("Invalid: {0}")]
    Invalid(String),

    /// JSON encoding/decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML encoding/decoding errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl CraneError {
    pub fn not_found(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            name: name.into(),
        }
    }

    pub fn already_exists(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource: resource.into(),
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::AlreadyExists { .. })
    }

    /// Translate a client error for `resource`/`name`, keeping the server's
    /// message verbatim.
    pub fn from_kube(err: kube::Error, resource: &str, name: &str) -> Self {
        match &err {
            kube::Error::Api(response) if response.code == 404 => {
                Self::not_found(resource, name)
            }
            kube::Error::Api(response) if response.code == 409 => {
                if response.reason == "AlreadyExists" {
                    Self::already_exists(resource, name)
                } else {
                    Self::Conflict(response.message.clone())
                }
            }
            kube::Error::Api(response) if response.code == 422 => {
                Self::Invalid(response.message.clone())
            }
            kube::Error::Api(_) => KubernetesError::ApiError(err.to_string()).into(),
            _ => KubernetesError::ConnectionFailed(err.to_string()).into(),
        }
    }
}

/// Kubernetes-specific errors
#[derive(Error, Debug)]
pub enum KubernetesError {
    /// API server connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// API error
    #[error("API error: {0}")]
    ApiError(String),

    /// Watch stream failed
    #[error("Watch failed: {0}")]
    WatchFailed(String),

    /// Informer cache never became ready
    #[error("Cache sync failed: {0}")]
    CacheSyncFailed(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing required configuration
    #[error("Missing required: {0}")]
    MissingRequired(String),

    /// Invalid configuration value
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Configuration file error
    #[error("File error: {0}")]
    FileError(String),
}

/// Label selector parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Requirement has no key
    #[error("empty key in requirement {0:?}")]
    EmptyKey(String),

    /// Unrecognised operator in a selector expression
    #[error("unknown operator {0:?}")]
    UnknownOperator(String),

    /// Set-based requirement without a parenthesised value list
    #[error("malformed value set in requirement {0:?}")]
    MalformedSet(String),

    /// Operator used with the wrong number of values
    #[error("operator {operator} on key {key:?} expects {expected}")]
    InvalidValues {
        key: String,
        operator: String,
        expected: &'static str,
    },
}

/// Helper type alias for Results
pub type Result<T> = std::result::Result<T, CraneError>;

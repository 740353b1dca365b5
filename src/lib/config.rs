use std::time::Duration;

use crate::{ConfigError, Result, Selector};

/// Default period after which informers re-deliver their cache to handlers
pub const DEFAULT_RESYNC_PERIOD: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct Config {
    pub context: Option<String>,
    pub namespace: Option<String>,
    pub label_selector: Option<String>,
    pub resync_period: Option<Duration>,
}

impl Config {
    pub fn new(
        context: Option<String>,
        namespace: Option<String>,
        label_selector: Option<String>,
        resync_seconds: u64,
    ) -> Result<Self> {
        if let Some(selector) = label_selector.as_deref() {
            // Reject bad selectors before any request reaches the server
            selector.parse::<Selector>()?;
        }
        if matches!(namespace.as_deref(), Some("")) {
            return Err(ConfigError::InvalidValue("namespace must not be empty".into()).into());
        }

        let resync_period = (resync_seconds > 0).then(|| Duration::from_secs(resync_seconds));

        Ok(Self {
            context,
            namespace,
            label_selector,
            resync_period,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context: None,
            namespace: None,
            label_selector: None,
            resync_period: Some(DEFAULT_RESYNC_PERIOD),
        }
    }
}

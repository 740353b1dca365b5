use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::lib::cli::OutputFormat;
use crate::lib::object::CraneObject;
use crate::{CraneError, Result};

/// One line of the resource table
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResourceRow {
    pub namespace: String,
    pub name: String,
    pub resource_version: String,
    pub age: String,
}

impl ResourceRow {
    pub fn from_object<K: CraneObject>(obj: &K, now: DateTime<Utc>) -> Self {
        let meta = obj.meta();
        Self {
            namespace: meta.namespace.clone().unwrap_or_default(),
            name: meta.name.clone().unwrap_or_default(),
            resource_version: meta.resource_version.clone().unwrap_or_default(),
            age: format_age(creation_time(obj), now),
        }
    }
}

pub fn rows<'a, K: CraneObject>(items: impl IntoIterator<Item = &'a K>) -> Vec<ResourceRow> {
    let now = Utc::now();
    items
        .into_iter()
        .map(|obj| ResourceRow::from_object(obj, now))
        .collect()
}

fn creation_time<K: CraneObject>(obj: &K) -> Option<DateTime<Utc>> {
    // Go through the wire form so the timestamp type of k8s-openapi does not matter
    let value = serde_json::to_value(obj.meta().creation_timestamp.as_ref()?).ok()?;
    DateTime::parse_from_rfc3339(value.as_str()?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// kubectl style age: the largest whole unit, e.g. `3d`, `5h`, `12m`, `40s`
pub fn format_age(created: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(created) = created else {
        return "<unknown>".to_string();
    };
    let elapsed = now.signed_duration_since(created);
    if elapsed.num_days() > 0 {
        format!("{}d", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}m", elapsed.num_minutes())
    } else {
        format!("{}s", elapsed.num_seconds().max(0))
    }
}

/// Serialize for json or yaml output
pub fn render<T: Serialize>(value: &T, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        OutputFormat::Table => Err(CraneError::Invalid(
            "table output is rendered interactively".into(),
        )),
    }
}

/// `ADDED default/web` style line for a watch event
pub fn event_line<K: CraneObject>(verb: &str, obj: &K) -> String {
    let meta = obj.meta();
    let name = meta.name.as_deref().unwrap_or_default();
    match meta.namespace.as_deref() {
        Some(ns) => format!("{verb:<9} {} {ns}/{name}", K::kind_name()),
        None => format!("{verb:<9} {} {name}", K::kind_name()),
    }
}

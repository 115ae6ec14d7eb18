use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{names, FetchContext, Source};

const API_VERSION: &str = "2021-04-01";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResourcesSection {
    pub total_count: u64,
    /// Counts bucketed by fully-qualified resource type.
    pub by_type: BTreeMap<String, u64>,
    pub by_location: BTreeMap<String, u64>,
}

/// Subscription-wide resource inventory counts.
pub(crate) struct ResourcesSource {
    ttl: Duration,
}

impl ResourcesSource {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

#[async_trait]
impl Source for ResourcesSource {
    fn name(&self) -> &'static str {
        names::RESOURCES
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Value> {
        let raw = ctx
            .arm_get(&format!("/resources?api-version={API_VERSION}"))
            .await?;
        let section = map_resource_list(&raw)?;
        serde_json::to_value(section).context("serializing resources section")
    }
}

pub(crate) fn map_resource_list(raw: &Value) -> Result<ResourcesSection> {
    let items = raw
        .get("value")
        .and_then(Value::as_array)
        .context("resource list missing value array")?;

    let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_location: BTreeMap<String, u64> = BTreeMap::new();
    for item in items {
        if let Some(kind) = item.get("type").and_then(Value::as_str) {
            *by_type.entry(kind.to_string()).or_default() += 1;
        }
        if let Some(location) = item.get("location").and_then(Value::as_str) {
            *by_location.entry(location.to_string()).or_default() += 1;
        }
    }

    Ok(ResourcesSection {
        total_count: items.len() as u64,
        by_type,
        by_location,
    })
}

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{names, FetchContext, Source};

const API_VERSION: &str = "2024-02-01";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServiceHealthSection {
    pub active_event_count: u64,
    pub events: Vec<HealthEvent>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HealthEvent {
    pub title: String,
    pub event_type: Option<String>,
    pub status: Option<String>,
}

/// Active service health events for the subscription.
pub(crate) struct ServiceHealthSource {
    ttl: Duration,
}

impl ServiceHealthSource {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

#[async_trait]
impl Source for ServiceHealthSource {
    fn name(&self) -> &'static str {
        names::SERVICE_HEALTH
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Value> {
        let raw = ctx
            .arm_get(&format!(
                "/providers/Microsoft.ResourceHealth/events?api-version={API_VERSION}"
            ))
            .await?;
        let section = map_health_events(&raw)?;
        serde_json::to_value(section).context("serializing serviceHealth section")
    }
}

pub(crate) fn map_health_events(raw: &Value) -> Result<ServiceHealthSection> {
    let items = raw
        .get("value")
        .and_then(Value::as_array)
        .context("health event list missing value array")?;

    let events: Vec<HealthEvent> = items
        .iter()
        .map(|item| HealthEvent {
            title: item
                .pointer("/properties/title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            event_type: item
                .pointer("/properties/eventType")
                .and_then(Value::as_str)
                .map(str::to_string),
            status: item
                .pointer("/properties/status")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect();

    Ok(ServiceHealthSection {
        active_event_count: events.len() as u64,
        events,
    })
}

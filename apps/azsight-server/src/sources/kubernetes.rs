use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{names, FetchContext, Source};

const API_VERSION: &str = "2024-05-01";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct KubernetesSection {
    pub cluster_count: u64,
    pub total_nodes: u64,
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Cluster {
    pub name: String,
    pub location: String,
    pub kubernetes_version: Option<String>,
    pub node_count: u64,
    pub power_state: Option<String>,
}

/// Managed AKS cluster inventory. A subscription with zero clusters is a
/// valid zero-section, not a fetch failure.
pub(crate) struct KubernetesSource {
    ttl: Duration,
}

impl KubernetesSource {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

#[async_trait]
impl Source for KubernetesSource {
    fn name(&self) -> &'static str {
        names::KUBERNETES
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Value> {
        let raw = ctx
            .arm_get(&format!(
                "/providers/Microsoft.ContainerService/managedClusters?api-version={API_VERSION}"
            ))
            .await?;
        let section = map_managed_clusters(&raw)?;
        serde_json::to_value(section).context("serializing kubernetes section")
    }
}

pub(crate) fn map_managed_clusters(raw: &Value) -> Result<KubernetesSection> {
    let items = raw
        .get("value")
        .and_then(Value::as_array)
        .context("managed cluster list missing value array")?;

    let clusters: Vec<Cluster> = items
        .iter()
        .map(|item| {
            let node_count = item
                .pointer("/properties/agentPoolProfiles")
                .and_then(Value::as_array)
                .map(|pools| {
                    pools
                        .iter()
                        .filter_map(|p| p.get("count").and_then(Value::as_u64))
                        .sum()
                })
                .unwrap_or(0);
            Cluster {
                name: item
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                location: item
                    .get("location")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                kubernetes_version: item
                    .pointer("/properties/kubernetesVersion")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                node_count,
                power_state: item
                    .pointer("/properties/powerState/code")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
        })
        .collect();

    let total_nodes = clusters.iter().map(|c| c.node_count).sum();
    Ok(KubernetesSection {
        cluster_count: clusters.len() as u64,
        total_nodes,
        clusters,
    })
}

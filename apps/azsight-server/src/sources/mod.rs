use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::{app_state::AppState, config::Config};

pub(crate) mod costs;
pub(crate) mod kubernetes;
pub(crate) mod openai;
pub(crate) mod resources;
pub(crate) mod service_health;
pub(crate) mod storage;
pub(crate) mod virtual_machines;

/// Section keys as they appear in the wire response. Doubling as cache
/// keys, so every source owns exactly one cache entry.
pub(crate) mod names {
    pub const COSTS: &str = "costs";
    pub const RESOURCES: &str = "resources";
    pub const STORAGE: &str = "storage";
    pub const KUBERNETES: &str = "kubernetes";
    pub const VIRTUAL_MACHINES: &str = "virtualMachines";
    pub const SERVICE_HEALTH: &str = "serviceHealth";
    pub const OPENAI_USAGE: &str = "openAIUsage";
}

/// One upstream data provider queried during aggregation. Fetchers are
/// read-only against the target systems and report failure as `Err`; the
/// executor owns the catch boundary, so nothing a fetcher does can abort a
/// sibling or escape the request.
#[async_trait]
pub(crate) trait Source: Send + Sync {
    fn name(&self) -> &'static str;

    /// TTL class for this source's cache entries.
    fn ttl(&self) -> Duration;

    /// Static fallback table served (tagged and recorded in `errors`) when
    /// both the live fetch and the cache come up empty. Default: none.
    fn fallback(&self) -> Option<Value> {
        None
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Value>;
}

/// Per-request execution context handed to every fetcher.
#[derive(Clone)]
pub(crate) struct FetchContext {
    pub http: reqwest::Client,
    pub management_base: String,
    pub arm_token: Option<String>,
    pub openai_base: String,
    pub openai_key: Option<String>,
    pub subscription_id: String,
}

impl FetchContext {
    pub fn from_state(state: &AppState, subscription_id: String) -> Self {
        let config = state.config();
        Self {
            http: state.http(),
            management_base: config.management_base.clone(),
            arm_token: config.arm_token.clone(),
            openai_base: config.openai_base.clone(),
            openai_key: config.openai_key.clone(),
            subscription_id,
        }
    }

    fn arm_bearer(&self) -> Result<&str> {
        self.arm_token
            .as_deref()
            .context("management-plane token not configured (AZSIGHT_ARM_TOKEN)")
    }

    /// GET against the management plane, relative to the subscription.
    pub async fn arm_get(&self, path_and_query: &str) -> Result<Value> {
        let url = format!(
            "{}/subscriptions/{}{}",
            self.management_base, self.subscription_id, path_and_query
        );
        let token = self.arm_bearer()?;
        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .with_context(|| format!("management API rejected {url}"))?;
        resp.json::<Value>()
            .await
            .with_context(|| format!("decoding response from {url}"))
    }

    /// POST against the management plane (the cost query endpoint).
    pub async fn arm_post(&self, path_and_query: &str, body: &Value) -> Result<Value> {
        let url = format!(
            "{}/subscriptions/{}{}",
            self.management_base, self.subscription_id, path_and_query
        );
        let token = self.arm_bearer()?;
        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .with_context(|| format!("management API rejected {url}"))?;
        resp.json::<Value>()
            .await
            .with_context(|| format!("decoding response from {url}"))
    }
}

/// The `type` query parameter: narrows which sources a run fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypeFilter {
    All,
    Resources,
    Kubernetes,
    Vms,
    Costs,
    Storage,
    Health,
}

impl TypeFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Some(TypeFilter::All),
            "resources" => Some(TypeFilter::Resources),
            "kubernetes" => Some(TypeFilter::Kubernetes),
            "vms" => Some(TypeFilter::Vms),
            "costs" => Some(TypeFilter::Costs),
            "storage" => Some(TypeFilter::Storage),
            "health" => Some(TypeFilter::Health),
            _ => None,
        }
    }

    pub fn selects(self, source: &str) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Resources => source == names::RESOURCES,
            TypeFilter::Kubernetes => source == names::KUBERNETES,
            TypeFilter::Vms => source == names::VIRTUAL_MACHINES,
            TypeFilter::Costs => source == names::COSTS,
            TypeFilter::Storage => source == names::STORAGE,
            TypeFilter::Health => source == names::SERVICE_HEALTH,
        }
    }
}

/// The full registry, one entry per dashboard section.
pub(crate) fn registry(config: &Config) -> Vec<Arc<dyn Source>> {
    vec![
        Arc::new(costs::CostsSource::new(config.costs_ttl)),
        Arc::new(resources::ResourcesSource::new(config.volatile_ttl)),
        Arc::new(storage::StorageSource::new(config.volatile_ttl)),
        Arc::new(kubernetes::KubernetesSource::new(config.volatile_ttl)),
        Arc::new(virtual_machines::VirtualMachinesSource::new(
            config.volatile_ttl,
        )),
        Arc::new(service_health::ServiceHealthSource::new(config.volatile_ttl)),
        Arc::new(openai::OpenAiUsageSource::new(config.volatile_ttl)),
    ]
}

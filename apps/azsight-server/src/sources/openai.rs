use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use super::{names, FetchContext, Source};

/// Version stamp for the static fallback table; bump when the table
/// changes so degraded payloads stay auditable.
const FALLBACK_VERSION: &str = "2026-07";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OpenAiUsageSection {
    pub date: String,
    pub total_requests: u64,
    pub context_tokens: u64,
    pub generated_tokens: u64,
    pub total_tokens: u64,
}

/// Token/request usage for the current day from the LLM provider's usage
/// API. The provider is opaque billing infrastructure; only the daily
/// totals surface on the dashboard.
pub(crate) struct OpenAiUsageSource {
    ttl: Duration,
}

impl OpenAiUsageSource {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

#[async_trait]
impl Source for OpenAiUsageSource {
    fn name(&self) -> &'static str {
        names::OPENAI_USAGE
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fallback(&self) -> Option<Value> {
        Some(json!({
            "date": "",
            "totalRequests": 0,
            "contextTokens": 0,
            "generatedTokens": 0,
            "totalTokens": 0,
            "fallbackVersion": FALLBACK_VERSION,
        }))
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Value> {
        let key = ctx
            .openai_key
            .as_deref()
            .context("usage API key not configured (AZSIGHT_OPENAI_KEY)")?;
        let date = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let url = format!("{}/v1/usage?date={}", ctx.openai_base, date);
        let raw = ctx
            .http
            .get(&url)
            .bearer_auth(key)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .context("usage API rejected the request")?
            .json::<Value>()
            .await
            .context("decoding usage API response")?;
        let section = map_usage(&raw, date)?;
        serde_json::to_value(section).context("serializing openAIUsage section")
    }
}

pub(crate) fn map_usage(raw: &Value, date: String) -> Result<OpenAiUsageSection> {
    let entries = raw
        .get("data")
        .and_then(Value::as_array)
        .context("usage response missing data array")?;

    let mut total_requests = 0u64;
    let mut context_tokens = 0u64;
    let mut generated_tokens = 0u64;
    for entry in entries {
        let field = |name: &str| entry.get(name).and_then(Value::as_u64).unwrap_or(0);
        total_requests += field("n_requests");
        context_tokens += field("n_context_tokens_total");
        generated_tokens += field("n_generated_tokens_total");
    }

    Ok(OpenAiUsageSection {
        date,
        total_requests,
        context_tokens,
        generated_tokens,
        total_tokens: context_tokens + generated_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_usage_entries() {
        let raw = json!({
            "data": [
                { "n_requests": 4, "n_context_tokens_total": 1200, "n_generated_tokens_total": 300 },
                { "n_requests": 1, "n_context_tokens_total": 800, "n_generated_tokens_total": 150 }
            ]
        });
        let section = map_usage(&raw, "2026-08-07".into()).expect("mapped");
        assert_eq!(section.total_requests, 5);
        assert_eq!(section.total_tokens, 2450);
    }

    #[test]
    fn empty_day_maps_to_zeros() {
        let section = map_usage(&json!({"data": []}), "2026-08-07".into()).expect("mapped");
        assert_eq!(section.total_tokens, 0);
    }

    #[test]
    fn fallback_table_is_version_stamped() {
        let fallback = OpenAiUsageSource::new(Duration::from_secs(60))
            .fallback()
            .expect("usage source has a fallback table");
        assert_eq!(fallback["fallbackVersion"], json!(FALLBACK_VERSION));
        assert_eq!(fallback["totalTokens"], json!(0));
    }
}

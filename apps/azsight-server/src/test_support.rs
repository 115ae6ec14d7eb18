use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use azsight_core::{Clock, TtlCache};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    app_state::AppState,
    config::Config,
    sources::{FetchContext, Source},
};

/// Scriptable source for pipeline tests: fixed payload or error, optional
/// delay, optional fallback table, and a call counter.
pub(crate) struct FakeSource {
    name: &'static str,
    ttl: Duration,
    delay: Duration,
    payload: Value,
    error: Option<String>,
    fallback: Option<Value>,
    cache_write: Option<(Arc<TtlCache>, Value)>,
    calls: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn ok(name: &'static str, payload: Value) -> Self {
        Self {
            name,
            ttl: Duration::from_secs(60),
            delay: Duration::ZERO,
            payload,
            error: None,
            fallback: None,
            cache_write: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &'static str, error: &str) -> Self {
        let mut source = Self::ok(name, Value::Null);
        source.error = Some(error.to_string());
        source
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_fallback(mut self, fallback: Value) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Writes `value` into `cache` under this source's name mid-fetch,
    /// simulating a sibling request refreshing the entry concurrently.
    pub fn with_cache_write(mut self, cache: Arc<TtlCache>, value: Value) -> Self {
        self.cache_write = Some((cache, value));
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Source for FakeSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fallback(&self) -> Option<Value> {
        self.fallback.clone()
    }

    async fn fetch(&self, _ctx: &FetchContext) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some((cache, value)) = &self.cache_write {
            cache.set(self.name, value.clone());
        }
        if let Some(error) = &self.error {
            bail!("{error}");
        }
        Ok(self.payload.clone())
    }
}

/// Clock whose reading only moves when a test says so.
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        let epoch = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .expect("valid epoch")
            .with_timezone(&Utc);
        Self {
            now: Mutex::new(epoch),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock");
        *now += chrono::Duration::from_std(by).expect("advance fits chrono range");
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub(crate) fn test_ctx(subscription_id: &str) -> FetchContext {
    FetchContext {
        http: reqwest::Client::new(),
        management_base: "http://127.0.0.1:1".to_string(),
        arm_token: Some("test-token".to_string()),
        openai_base: "http://127.0.0.1:1".to_string(),
        openai_key: None,
        subscription_id: subscription_id.to_string(),
    }
}

pub(crate) fn state_with(
    config: Config,
    cache: Arc<TtlCache>,
    sources: Vec<Arc<dyn Source>>,
) -> AppState {
    AppState::new(
        Arc::new(config),
        cache,
        Arc::new(sources),
        reqwest::Client::new(),
        Arc::new(Vec::new()),
    )
}

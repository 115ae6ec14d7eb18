use std::sync::Arc;

use azsight_core::TtlCache;

use crate::{config::Config, sources::Source};

/// Process-wide shared state. Everything here is read-only after bootstrap
/// except the cache, which owns its own interior locking.
#[derive(Clone)]
pub(crate) struct AppState {
    config: Arc<Config>,
    cache: Arc<TtlCache>,
    sources: Arc<Vec<Arc<dyn Source>>>,
    http: reqwest::Client,
    endpoints: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        cache: Arc<TtlCache>,
        sources: Arc<Vec<Arc<dyn Source>>>,
        http: reqwest::Client,
        endpoints: Arc<Vec<String>>,
    ) -> Self {
        Self {
            config,
            cache,
            sources,
            http,
            endpoints,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    pub fn http(&self) -> reqwest::Client {
        self.http.clone()
    }

    pub fn endpoints(&self) -> Arc<Vec<String>> {
        self.endpoints.clone()
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Where a served section value came from. Serialized into every section
/// payload so dashboards can tell degraded data from a live read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Live,
    Cache,
    Fallback,
}

impl DataOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            DataOrigin::Live => "live",
            DataOrigin::Cache => "cache",
            DataOrigin::Fallback => "fallback",
        }
    }
}

/// One section that failed during an aggregation run and could not be
/// served from cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SourceError {
    pub source: String,
    pub message: String,
}

/// Terminal state of a single fetcher invocation.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(Value),
    Failure(String),
}

/// Outcome of one fetcher, with wall-clock duration for diagnostics.
#[derive(Debug, Clone)]
pub struct SourceResult {
    pub name: &'static str,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

impl SourceResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }
}

/// Aggregate payload assembled per request. Owned by the request that
/// produced it; never shared across requests.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// RFC 3339 instant the snapshot was assembled.
    pub timestamp: String,
    pub subscription_id: String,
    /// Every source registered for the run appears as a key; `None` means
    /// the fetch failed and neither cache nor fallback could cover it.
    pub sections: BTreeMap<&'static str, Option<Value>>,
    pub errors: Vec<SourceError>,
}

impl MetricsSnapshot {
    pub fn new(timestamp: String, subscription_id: String) -> Self {
        Self {
            timestamp,
            subscription_id,
            sections: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// Insert a section value. Last write wins on duplicate names; outcomes
    /// are never field-merged.
    pub fn set_section(&mut self, name: &'static str, value: Option<Value>) {
        self.sections.insert(name, value);
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name).and_then(|v| v.as_ref())
    }

    pub fn push_error(&mut self, source: &str, message: impl Into<String>) {
        self.errors.push(SourceError {
            source: source.to_string(),
            message: message.into(),
        });
    }
}

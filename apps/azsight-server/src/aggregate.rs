use std::sync::Arc;
use std::time::Duration;

use azsight_core::{DataOrigin, MetricsSnapshot, Outcome, SourceResult, TtlCache};
use chrono::SecondsFormat;
use futures_util::future::join_all;
use serde_json::Value;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use crate::sources::{FetchContext, Source};

/// Terminal state of one source in a run, plus whether the value came
/// straight out of the freshness window without a vendor call.
struct Resolved {
    source: Arc<dyn Source>,
    result: SourceResult,
    read_through: bool,
}

/// Fan out every selected source concurrently and merge the outcomes into
/// one snapshot. Settle-all: the run waits for every fetcher to reach a
/// terminal state; a failing or slow source never aborts its siblings, so
/// total wall clock tracks the slowest fetcher rather than the sum.
pub(crate) async fn collect(
    sources: &[Arc<dyn Source>],
    ctx: &FetchContext,
    cache: &TtlCache,
    deadline: Duration,
) -> MetricsSnapshot {
    let resolved = join_all(sources.iter().map(|source| {
        let source = Arc::clone(source);
        async move {
            let started = Instant::now();
            // Fresh cache short-circuits the vendor call entirely, so a
            // polling dashboard inside the TTL window sees byte-identical
            // payloads and the provider sees one query per window.
            if let Some(hit) = cache.get(source.name(), source.ttl()) {
                let result = SourceResult {
                    name: source.name(),
                    outcome: Outcome::Success(hit),
                    duration_ms: elapsed_ms(started),
                };
                return Resolved {
                    source,
                    result,
                    read_through: true,
                };
            }
            let outcome = match timeout(deadline, source.fetch(ctx)).await {
                Ok(Ok(value)) => Outcome::Success(value),
                Ok(Err(err)) => Outcome::Failure(format!("{err:#}")),
                Err(_) => Outcome::Failure("timeout".to_string()),
            };
            let result = SourceResult {
                name: source.name(),
                outcome,
                duration_ms: elapsed_ms(started),
            };
            Resolved {
                source,
                result,
                read_through: false,
            }
        }
    }))
    .await;

    let mut snapshot = MetricsSnapshot::new(
        chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        ctx.subscription_id.clone(),
    );
    for item in resolved {
        merge(&mut snapshot, cache, item);
    }
    snapshot
}

/// Resolution order for one source: live write-through, then fresh cache,
/// then the source's static fallback table, then null plus an error entry.
/// Only a verified live success may write the cache.
fn merge(snapshot: &mut MetricsSnapshot, cache: &TtlCache, item: Resolved) {
    let name = item.source.name();
    match item.result.outcome {
        Outcome::Success(mut value) => {
            if item.read_through {
                debug!(
                    target: "azsight::aggregate",
                    source = name,
                    "cache hit inside freshness window"
                );
            } else {
                tag_origin(&mut value, DataOrigin::Live);
                cache.set(name, value.clone());
                debug!(
                    target: "azsight::aggregate",
                    source = name,
                    duration_ms = item.result.duration_ms,
                    "source fetched live"
                );
            }
            snapshot.set_section(name, Some(value));
        }
        Outcome::Failure(reason) => {
            warn!(
                target: "azsight::aggregate",
                source = name,
                duration_ms = item.result.duration_ms,
                error = %reason,
                "source fetch failed"
            );
            if let Some(mut cached) = cache.get(name, item.source.ttl()) {
                // A sibling request refreshed the entry while this fetch was
                // failing; serve it, re-tagged so the degradation is visible.
                tag_origin(&mut cached, DataOrigin::Cache);
                snapshot.set_section(name, Some(cached));
            } else if let Some(mut fallback) = item.source.fallback() {
                tag_origin(&mut fallback, DataOrigin::Fallback);
                snapshot.set_section(name, Some(fallback));
                snapshot.push_error(name, reason);
            } else {
                snapshot.set_section(name, None);
                snapshot.push_error(name, reason);
            }
        }
    }
}

/// Stamp the served value with where it came from. Non-object payloads are
/// left untouched.
fn tag_origin(payload: &mut Value, origin: DataOrigin) {
    if let Value::Object(map) = payload {
        map.insert("source".into(), Value::String(origin.as_str().into()));
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

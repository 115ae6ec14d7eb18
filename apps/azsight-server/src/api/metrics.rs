use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use azsight_core::{MetricsSnapshot, SourceError};

use crate::{
    aggregate, responses,
    sources::{names, FetchContext, Source, TypeFilter},
    AppState,
};

#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub(crate) struct MetricsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "subscriptionId")]
    pub subscription_id: Option<String>,
}

/// Flattened snapshot as the dashboard consumes it. Sections not selected
/// by the `type` filter serialize as `null` with no error entry.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetricsResponse {
    pub timestamp: String,
    pub subscription_id: String,
    #[schema(value_type = Option<Object>)]
    pub costs: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub resources: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub storage: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub kubernetes: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub virtual_machines: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub service_health: Option<Value>,
    #[serde(rename = "openAIUsage")]
    #[schema(value_type = Option<Object>)]
    pub open_ai_usage: Option<Value>,
    pub errors: Vec<SourceError>,
}

impl MetricsResponse {
    fn from_snapshot(mut snapshot: MetricsSnapshot) -> Self {
        let costs = snapshot.sections.remove(names::COSTS).flatten();
        let resources = snapshot.sections.remove(names::RESOURCES).flatten();
        let storage = snapshot.sections.remove(names::STORAGE).flatten();
        let kubernetes = snapshot.sections.remove(names::KUBERNETES).flatten();
        let virtual_machines = snapshot.sections.remove(names::VIRTUAL_MACHINES).flatten();
        let service_health = snapshot.sections.remove(names::SERVICE_HEALTH).flatten();
        let open_ai_usage = snapshot.sections.remove(names::OPENAI_USAGE).flatten();
        Self {
            costs,
            resources,
            storage,
            kubernetes,
            virtual_machines,
            service_health,
            open_ai_usage,
            timestamp: snapshot.timestamp,
            subscription_id: snapshot.subscription_id,
            errors: snapshot.errors,
        }
    }
}

/// Aggregated dashboard metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Metrics",
    operation_id = "metrics_doc",
    description = "Fan out to the registered cloud sources and return one merged snapshot. \
                   Partial upstream failure still returns 200 with the failed sections null \
                   or cache-substituted.",
    params(
        ("type" = Option<String>, Query, description = "all|resources|kubernetes|vms|costs|storage|health"),
        ("subscriptionId" = Option<String>, Query, description = "Subscription scope; falls back to the configured default")
    ),
    responses(
        (status = 200, description = "Merged snapshot", body = MetricsResponse),
        (status = 400, description = "Missing subscription id or unknown type filter")
    )
)]
pub async fn metrics_get(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Response {
    run_aggregation(state, query).await
}

/// POST variant for callers that send the scope in a JSON body; the
/// pipeline is identical. Query parameters win over body fields.
#[utoipa::path(
    post,
    path = "/metrics",
    tag = "Metrics",
    operation_id = "metrics_post_doc",
    description = "Same aggregation as GET /metrics; accepts the scope in a JSON body.",
    responses(
        (status = 200, description = "Merged snapshot", body = MetricsResponse),
        (status = 400, description = "Missing subscription id or unknown type filter")
    )
)]
pub async fn metrics_post(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
    body: Option<Json<MetricsQuery>>,
) -> Response {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let merged = MetricsQuery {
        kind: query.kind.or(body.kind),
        subscription_id: query.subscription_id.or(body.subscription_id),
    };
    run_aggregation(state, merged).await
}

async fn run_aggregation(state: AppState, query: MetricsQuery) -> Response {
    let filter = match query.kind.as_deref() {
        None => TypeFilter::All,
        Some(raw) => match TypeFilter::parse(raw) {
            Some(filter) => filter,
            None => return responses::bad_request("unknown type filter"),
        },
    };
    let Some(subscription_id) = query
        .subscription_id
        .or_else(|| state.config().subscription_id.clone())
    else {
        return responses::bad_request("missing subscriptionId");
    };

    let ctx = FetchContext::from_state(&state, subscription_id);
    let selected: Vec<Arc<dyn Source>> = state
        .sources()
        .iter()
        .filter(|source| filter.selects(source.name()))
        .cloned()
        .collect();
    let snapshot =
        aggregate::collect(&selected, &ctx, state.cache(), state.config().fetch_deadline).await;

    // Serialization happens inside Json; a failure there is the one
    // remaining handler fault and surfaces as 500.
    Json(MetricsResponse::from_snapshot(snapshot)).into_response()
}

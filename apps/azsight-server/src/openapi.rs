use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "azsight-server",
        description = "Cloud metrics aggregation service: fans out to Azure and LLM-usage \
                       APIs and serves one merged, cached dashboard snapshot."
    ),
    paths(
        crate::api::metrics::metrics_get,
        crate::api::metrics::metrics_post,
        crate::api::meta::healthz,
        crate::api::meta::about,
    ),
    components(schemas(
        crate::api::metrics::MetricsResponse,
        azsight_core::SourceError,
        azsight_core::DataOrigin,
    )),
    tags(
        (name = "Metrics", description = "Aggregated dashboard sections"),
        (name = "Meta", description = "Service metadata and probes")
    )
)]
pub(crate) struct ApiDoc;

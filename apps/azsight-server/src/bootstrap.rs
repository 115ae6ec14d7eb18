use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;

use azsight_core::TtlCache;

use crate::{
    app_state::AppState, config::Config, http_client, openapi, router::build_router, sources,
};

pub(crate) struct BootstrapOutput {
    pub router: axum::Router<AppState>,
    pub state: AppState,
}

pub(crate) async fn build() -> BootstrapOutput {
    let config = Arc::new(Config::from_env());
    let cache = Arc::new(TtlCache::new());
    let sources = Arc::new(sources::registry(&config));
    let (router, endpoints) = build_router();

    let state = AppState::new(
        config.clone(),
        cache,
        sources,
        http_client::client().clone(),
        Arc::new(endpoints),
    );

    info!(
        sources = state.sources().len(),
        subscription_configured = config.subscription_id.is_some(),
        "aggregation pipeline ready"
    );

    BootstrapOutput { router, state }
}

/// Outermost layers: CORS, compression, request tracing, and a concurrency
/// ceiling. The first layer listed runs last on the way in.
pub(crate) fn attach_http_layers(
    router: axum::Router<()>,
    config: &Config,
    concurrency_limit: usize,
) -> axum::Router<()> {
    use tower::limit::ConcurrencyLimitLayer;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    router
        .layer(cors_layer(&config.allowed_origins))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
}

/// Mirror-on-match CORS from the configured allow-list; an empty list opens
/// the surface for local development. Preflight OPTIONS is answered by the
/// layer with an empty body.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if allowed_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let list: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(list))
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum HttpConfigError {
    #[error("invalid AZSIGHT_HTTP_MAX_CONC: {0}")]
    InvalidConcurrency(String),
    #[error("invalid AZSIGHT_PORT: {0}")]
    InvalidPort(String),
    #[error("invalid AZSIGHT_BIND: {0}")]
    InvalidBind(String),
}

pub(crate) struct HttpConfig {
    pub addr: std::net::SocketAddr,
    pub concurrency_limit: usize,
}

pub(crate) fn http_config_from_env() -> Result<HttpConfig, HttpConfigError> {
    let concurrency_limit = std::env::var("AZSIGHT_HTTP_MAX_CONC")
        .ok()
        .map(|raw| {
            raw.parse()
                .map_err(|_| HttpConfigError::InvalidConcurrency(raw))
        })
        .transpose()?
        .unwrap_or(1024);

    let bind = std::env::var("AZSIGHT_BIND").unwrap_or_else(|_| "127.0.0.1".into());
    let port_raw = std::env::var("AZSIGHT_PORT").unwrap_or_else(|_| "8912".into());
    let port: u16 = port_raw
        .parse()
        .map_err(|_| HttpConfigError::InvalidPort(port_raw))?;

    let addr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|_| HttpConfigError::InvalidBind(bind.clone()))?;

    Ok(HttpConfig {
        addr,
        concurrency_limit,
    })
}

/// CI hook: when OPENAPI_OUT is set, write the generated document and exit
/// instead of serving.
pub(crate) fn ensure_openapi_export() -> Result<Option<String>, std::io::Error> {
    if let Ok(path) = std::env::var("OPENAPI_OUT") {
        let doc = openapi::ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        std::fs::write(&path, json)?;
        return Ok(Some(path));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_config_defaults_to_loopback() {
        // Relies on the test environment not setting AZSIGHT_BIND/PORT.
        let cfg = http_config_from_env().expect("defaults parse");
        assert!(cfg.addr.ip().is_loopback());
        assert_eq!(cfg.addr.port(), 8912);
        assert_eq!(cfg.concurrency_limit, 1024);
    }

    #[test]
    fn openapi_export_writes_a_parseable_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("openapi.json");
        std::env::set_var("OPENAPI_OUT", &path);
        let written = ensure_openapi_export().expect("export succeeds");
        std::env::remove_var("OPENAPI_OUT");

        assert_eq!(written, Some(path.display().to_string()));
        let raw = std::fs::read_to_string(&path).expect("document written");
        let doc: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        assert!(doc["paths"]["/metrics"].is_object());
    }
}

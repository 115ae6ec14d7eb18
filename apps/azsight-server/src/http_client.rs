use once_cell::sync::OnceCell;
use std::time::Duration;

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

fn connect_timeout() -> Duration {
    Duration::from_secs(env_u64("AZSIGHT_HTTP_CONNECT_TIMEOUT_SECS", 3).max(1))
}

fn keepalive() -> Duration {
    Duration::from_secs(env_u64("AZSIGHT_HTTP_TCP_KEEPALIVE_SECS", 60).max(1))
}

fn pool_idle() -> Duration {
    Duration::from_secs(env_u64("AZSIGHT_HTTP_POOL_IDLE_SECS", 90).max(1))
}

/// Per-request ceiling for outbound vendor calls. The aggregation deadline
/// in `Config` is usually shorter and wins.
fn request_timeout() -> Duration {
    Duration::from_secs(env_u64("AZSIGHT_HTTP_TIMEOUT_SECS", 20).max(1))
}

fn user_agent() -> String {
    format!("azsight-server/{}", env!("CARGO_PKG_VERSION"))
}

/// Base client builder with harmonized defaults.
pub fn builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .connect_timeout(connect_timeout())
        .tcp_keepalive(keepalive())
        .pool_idle_timeout(pool_idle())
}

/// Shared default client honoring the global outbound request timeout.
pub fn client() -> &'static reqwest::Client {
    static CLIENT: OnceCell<reqwest::Client> = OnceCell::new();
    CLIENT.get_or_init(|| {
        builder()
            .timeout(request_timeout())
            .build()
            .expect("http client")
    })
}

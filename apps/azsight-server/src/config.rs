use std::time::Duration;

const DEFAULT_ARM_URL: &str = "https://management.azure.com";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_secs(secs.max(1))
}

/// Runtime configuration for the aggregation pipeline, read once at
/// startup. Listener/bind settings live in `bootstrap` because a bad value
/// there refuses startup rather than degrading.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    /// Default subscription scope; requests may override via query/body.
    pub subscription_id: Option<String>,
    pub management_base: String,
    /// Pre-acquired management-plane bearer token; rotation is owned by the
    /// deployment environment, not this service.
    pub arm_token: Option<String>,
    pub openai_base: String,
    pub openai_key: Option<String>,
    /// CORS allow-list. Empty means any origin is mirrored (dev default).
    pub allowed_origins: Vec<String>,
    /// Shared per-request deadline applied to every fetcher.
    pub fetch_deadline: Duration,
    /// TTL class for the slow-moving cost data (provider granularity is
    /// daily, so an hour of staleness is invisible to callers).
    pub costs_ttl: Duration,
    /// TTL class for everything else.
    pub volatile_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let allowed_origins = env_nonempty("AZSIGHT_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            subscription_id: env_nonempty("AZSIGHT_SUBSCRIPTION_ID"),
            management_base: env_nonempty("AZSIGHT_ARM_URL")
                .unwrap_or_else(|| DEFAULT_ARM_URL.to_string()),
            arm_token: env_nonempty("AZSIGHT_ARM_TOKEN"),
            openai_base: env_nonempty("AZSIGHT_OPENAI_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
            openai_key: env_nonempty("AZSIGHT_OPENAI_KEY"),
            allowed_origins,
            fetch_deadline: env_secs("AZSIGHT_FETCH_DEADLINE_SECS", 10),
            costs_ttl: env_secs("AZSIGHT_COSTS_TTL_SECS", 3600),
            volatile_ttl: env_secs("AZSIGHT_SOURCE_TTL_SECS", 60),
        }
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Self {
            subscription_id: None,
            management_base: DEFAULT_ARM_URL.to_string(),
            arm_token: None,
            openai_base: DEFAULT_OPENAI_URL.to_string(),
            openai_key: None,
            allowed_origins: Vec::new(),
            fetch_deadline: Duration::from_secs(10),
            costs_ttl: Duration::from_secs(3600),
            volatile_ttl: Duration::from_secs(60),
        }
    }
}

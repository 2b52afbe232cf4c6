//! Server configuration.
//!
//! Every setting comes from a `JIT_*` environment variable. Missing or invalid values fall back to a default, and the
//! fallback is logged so that a misconfigured deployment is visible in the start-up log.
use std::{env, fmt::Display, str::FromStr, time::Duration};

use jit_common::{parse_boolean_flag, Secret};
use jit_funding_engine::{
    cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CARD_TTL, DEFAULT_USER_TTL},
    jit_api::{config::DEFAULT_DECISION_BUDGET, fallback::DEFAULT_REMOTE_TIMEOUT},
    queue::RetryPolicy,
    JitConfig,
    LimitEnforcement,
};
use log::*;

const DEFAULT_JIT_HOST: &str = "127.0.0.1";
const DEFAULT_JIT_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/jit_store.db";
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-network-signature";
pub const DEFAULT_CLEARING_BUFFER_SIZE: usize = 1000;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub webhook: WebhookConfig,
    /// The key callers of the `/api` routes must present in the `x-admin-key` header. If empty, those routes reject
    /// every request.
    pub admin_api_key: Secret<String>,
    pub cache: CacheConfig,
    pub engine: JitConfig,
    pub remote_authority: Option<RemoteAuthorityConfig>,
    pub clearing: ClearingConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub secret: Secret<String>,
    pub signature_header: String,
    pub hmac_checks: bool,
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// When set (and the `redis` feature is enabled), records are cached in Redis instead of in-process.
    pub redis_url: Option<String>,
    pub capacity: usize,
    pub card_ttl: Duration,
    pub user_ttl: Duration,
}

#[derive(Clone, Debug)]
pub struct RemoteAuthorityConfig {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Clone, Copy, Debug)]
pub struct ClearingConfig {
    pub buffer_size: usize,
    pub retry_policy: RetryPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_JIT_HOST.to_string(),
            port: DEFAULT_JIT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            webhook: WebhookConfig::default(),
            admin_api_key: Secret::default(),
            cache: CacheConfig::default(),
            engine: JitConfig::default(),
            remote_authority: None,
            clearing: ClearingConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { secret: Secret::default(), signature_header: DEFAULT_SIGNATURE_HEADER.to_string(), hmac_checks: true }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            capacity: DEFAULT_CACHE_CAPACITY,
            card_ttl: DEFAULT_CARD_TTL,
            user_ttl: DEFAULT_USER_TTL,
        }
    }
}

impl Default for ClearingConfig {
    fn default() -> Self {
        Self { buffer_size: DEFAULT_CLEARING_BUFFER_SIZE, retry_policy: RetryPolicy::default() }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("JIT_HOST").ok().unwrap_or_else(|| DEFAULT_JIT_HOST.into());
        let port = parse_env("JIT_PORT", DEFAULT_JIT_PORT);
        let database_url = env::var("JIT_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ JIT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let admin_api_key = Secret::new(env::var("JIT_ADMIN_API_KEY").ok().unwrap_or_else(|| {
            warn!("🪛️ JIT_ADMIN_API_KEY is not set. The /api routes will reject every request.");
            String::default()
        }));
        let use_x_forwarded_for = parse_boolean_flag(env::var("JIT_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("JIT_USE_FORWARDED").ok(), false);
        Self {
            host,
            port,
            database_url,
            webhook: WebhookConfig::from_env_or_default(),
            admin_api_key,
            cache: CacheConfig::from_env_or_default(),
            engine: engine_config_from_env(),
            remote_authority: RemoteAuthorityConfig::from_env(),
            clearing: ClearingConfig::from_env_or_default(),
            use_x_forwarded_for,
            use_forwarded,
        }
    }
}

impl WebhookConfig {
    pub fn from_env_or_default() -> Self {
        let secret = env::var("JIT_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ JIT_WEBHOOK_SECRET is not set. Please set it to the secret the card network signs webhooks with. \
                 Until then, every webhook delivery will be rejected."
            );
            String::default()
        });
        let signature_header = env::var("JIT_WEBHOOK_SIGNATURE_HEADER")
            .map(|s| s.to_lowercase())
            .ok()
            .unwrap_or_else(|| DEFAULT_SIGNATURE_HEADER.to_string());
        let hmac_checks = parse_boolean_flag(env::var("JIT_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Anyone can submit network events to this server. 🚨️");
        }
        Self { secret: Secret::new(secret), signature_header, hmac_checks }
    }
}

impl CacheConfig {
    pub fn from_env_or_default() -> Self {
        let redis_url = env::var("JIT_REDIS_URL").ok().filter(|s| !s.trim().is_empty());
        if redis_url.is_none() {
            info!("🪛️ JIT_REDIS_URL is not set. Records will be cached in-process.");
        }
        let capacity = parse_env("JIT_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY);
        let card_ttl = Duration::from_secs(parse_env("JIT_CARD_CACHE_TTL", DEFAULT_CARD_TTL.as_secs()));
        let user_ttl = Duration::from_secs(parse_env("JIT_USER_CACHE_TTL", DEFAULT_USER_TTL.as_secs()));
        Self { redis_url, capacity, card_ttl, user_ttl }
    }
}

impl RemoteAuthorityConfig {
    pub fn from_env() -> Option<Self> {
        let url = env::var("JIT_REMOTE_AUTHORITY_URL").ok().filter(|s| !s.trim().is_empty());
        let Some(url) = url else {
            info!("🪛️ JIT_REMOTE_AUTHORITY_URL is not set. All decisions will be made locally.");
            return None;
        };
        let default_ms = u64::try_from(DEFAULT_REMOTE_TIMEOUT.as_millis()).unwrap_or(u64::MAX);
        let timeout = Duration::from_millis(parse_env("JIT_REMOTE_AUTHORITY_TIMEOUT_MS", default_ms));
        info!("🪛️ Decisions will be delegated to {url}, with a {}ms timeout.", timeout.as_millis());
        Some(Self { url, timeout })
    }
}

impl ClearingConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = RetryPolicy::default();
        let buffer_size = parse_env("JIT_CLEARING_BUFFER_SIZE", DEFAULT_CLEARING_BUFFER_SIZE).max(1);
        let max_retries = parse_env("JIT_CLEARING_MAX_RETRIES", defaults.max_retries);
        let default_delay = u64::try_from(defaults.base_delay.as_millis()).unwrap_or(u64::MAX);
        let base_delay = Duration::from_millis(parse_env("JIT_CLEARING_RETRY_DELAY_MS", default_delay));
        Self { buffer_size, retry_policy: RetryPolicy { max_retries, base_delay } }
    }
}

fn engine_config_from_env() -> JitConfig {
    let default_ms = u64::try_from(DEFAULT_DECISION_BUDGET.as_millis()).unwrap_or(u64::MAX);
    let budget = Duration::from_millis(parse_env("JIT_DECISION_BUDGET_MS", default_ms));
    let enforcement = parse_env("JIT_LIMIT_ENFORCEMENT", LimitEnforcement::default());
    info!("🪛️ Daily limits are enforced in {enforcement} mode");
    JitConfig::default().with_decision_budget(budget).with_limit_enforcement(enforcement)
}

/// Reads and parses an environment variable, logging and using `default` when it is missing or invalid.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}

use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use jit_funding_engine::{
    cache::{CacheBackend, MemoryCache, ReadThroughCache},
    events::EventProducers,
    jit_api::network_objects::ClearingJob,
    queue::JobPublisher,
    FallbackAuthorizer,
    JitFundingApi,
    NetworkEventApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    clearing_worker::start_clearing_worker,
    config::{CacheConfig, ServerConfig, ServerOptions},
    errors::ServerError,
    middleware::{AdminKeyMiddlewareFactory, HmacMiddlewareFactory},
    remote_authority::HttpAuthority,
    routes::{health, AuthorizeRoute, TraceForEventRoute, TracesForCardRoute},
    webhook_routes::NetworkWebhookRoute,
};

/// How long the clearing worker gets to record queued events once the HTTP server has stopped.
pub const CLEARING_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub type LocalAuthorizer = JitFundingApi<SqliteDatabase, CacheBackend>;
pub type ServerAuthorizer = FallbackAuthorizer<HttpAuthority, LocalAuthorizer>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let cache = ReadThroughCache::new(build_cache(&config.cache).await)
        .with_ttls(config.cache.card_ttl, config.cache.user_ttl);
    let producers = EventProducers::default();
    let local = JitFundingApi::new(db.clone(), cache.clone(), config.engine, producers.clone());
    let remote = match &config.remote_authority {
        Some(remote) => Some(HttpAuthority::new(&remote.url, config.admin_api_key.clone(), remote.timeout)?),
        None => None,
    };
    let mut authorizer = FallbackAuthorizer::new(remote, local);
    if let Some(remote) = &config.remote_authority {
        authorizer = authorizer.with_timeout(remote.timeout);
    }
    let events = NetworkEventApi::new(db.clone(), cache, producers);
    let worker = start_clearing_worker(events.clone(), config.clearing);
    let srv = create_server_instance(config, db, authorizer, events, worker.publisher.clone())?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    // The server's publisher clones went with its workers, so the queue can now run dry
    info!("📬️ Server has stopped. Draining the clearing queue.");
    if worker.shutdown(CLEARING_DRAIN_TIMEOUT).await {
        info!("📬️ Clearing queue drained");
    }
    result
}

/// Picks the cache backend. Redis is used when a URL is configured and the `redis` feature is enabled; if Redis can't
/// be reached, the server still starts with an in-process cache.
pub async fn build_cache(config: &CacheConfig) -> CacheBackend {
    #[cfg(feature = "redis")]
    if let Some(url) = &config.redis_url {
        match jit_funding_engine::cache::RedisCache::connect(url).await {
            Ok(redis) => return CacheBackend::Redis(redis),
            Err(e) => warn!("🧊️ Could not connect to Redis. Falling back to the in-process cache. {e}"),
        }
    }
    #[cfg(not(feature = "redis"))]
    if config.redis_url.is_some() {
        warn!("🧊️ JIT_REDIS_URL is set, but this build has no Redis support. Using the in-process cache.");
    }
    info!("🧊️ Using an in-process cache with room for {} entries", config.capacity);
    CacheBackend::from(MemoryCache::new(config.capacity))
}

/// Malformed JSON bodies on the `/api` routes are answered with a `ServerError` body, like every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|e, _req| ServerError::InvalidRequestBody(e.to_string()).into())
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    authorizer: ServerAuthorizer,
    events: NetworkEventApi<SqliteDatabase, CacheBackend>,
    clearing: JobPublisher<ClearingJob>,
) -> Result<Server, ServerError> {
    let options = ServerOptions::from_config(&config);
    let webhook = config.webhook.clone();
    let admin_api_key = config.admin_api_key.clone();
    let srv = HttpServer::new(move || {
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("jit::access_log"))
            .app_data(web::Data::new(options))
            .app_data(web::Data::new(authorizer.clone()))
            .app_data(web::Data::new(events.clone()))
            .app_data(web::Data::new(clearing.clone()))
            .app_data(web::Data::new(db.clone()));
        // Webhook deliveries must be signed by the card network
        let webhook_scope = web::scope("/webhooks")
            .wrap(HmacMiddlewareFactory::new(&webhook.signature_header, webhook.secret.clone(), webhook.hmac_checks))
            .service(NetworkWebhookRoute::<ServerAuthorizer, SqliteDatabase>::new());
        // Routes that require the admin key
        let admin_scope = web::scope("/api")
            .wrap(AdminKeyMiddlewareFactory::new(admin_api_key.clone()))
            .app_data(json_config())
            .service(AuthorizeRoute::<ServerAuthorizer>::new())
            .service(TraceForEventRoute::<SqliteDatabase>::new())
            .service(TracesForCardRoute::<SqliteDatabase>::new());
        app.service(health).service(webhook_scope).service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

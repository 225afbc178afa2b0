use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use onepager::config::Config;
use onepager::db::create_pool;
use onepager::generation::LlmGenerationBackend;
use onepager::llm_client::LlmClient;
use onepager::persistence::{PgBrandKitStore, PgDocumentStore};
use onepager::render::{HttpTemplateEngine, RedisMarkupCache};
use onepager::routes::build_router;
use onepager::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting one-pager API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgDocumentStore::new(db.clone()));
    let brand_kits = Arc::new(PgBrandKitStore::new(db));

    // Initialize Redis-backed styled markup cache
    let redis = redis::Client::open(config.redis_url.clone())?;
    let markup_cache = Arc::new(RedisMarkupCache::new(redis, config.styled_cache_ttl_secs));
    info!("Redis client initialized");

    // Initialize LLM-backed generation
    let llm = LlmClient::new(config.llm_api_key.clone(), config.llm_model.clone());
    info!("LLM client initialized (model: {})", llm.model());
    let generator = Arc::new(LlmGenerationBackend::new(llm));

    // External document-template engine
    let engine = Arc::new(HttpTemplateEngine::new(config.template_engine_url.clone()));
    info!("Template engine at {}", config.template_engine_url);

    let state = AppState::new(store, brand_kits, generator, engine, markup_cache)
        .with_autosave_debounce(config.autosave_debounce);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

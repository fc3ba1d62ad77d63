mod config;
mod db;
mod errors;
mod interview;
mod llm_client;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::interview::evaluator::LlmEvaluator;
use crate::interview::session::InterviewService;
use crate::interview::session_store::RedisSessionStore;
use crate::interview::store::{CandidateStore, PgCandidateStore};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

/// How long completed session keys linger before the deferred clear, so the
/// presentation layer gets a final render window.
const SESSION_CLEAR_DELAY: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let crate_target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{crate_target}={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Crucible API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (candidates + answer records)
    let pool = create_pool(&config.database_url).await?;

    // Initialize Redis (session resumption store)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize the LLM-backed evaluator
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!(
        "LLM client initialized (model: {}, budget: {}s)",
        llm_client::MODEL,
        config.ai_timeout_secs
    );
    let evaluator = Arc::new(LlmEvaluator::new(llm, config.ai_timeout_secs));

    let candidates: Arc<dyn CandidateStore> = Arc::new(PgCandidateStore::new(pool));
    let sessions = Arc::new(RedisSessionStore::new(redis));

    let interview = Arc::new(InterviewService::new(
        Arc::clone(&candidates),
        sessions,
        evaluator,
        SESSION_CLEAR_DELAY,
    ));

    let state = AppState {
        interview,
        candidates,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

mod collaborators;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::collaborators::evaluator::LlmAnswerEvaluator;
use crate::collaborators::notifier::{HttpNotifier, LogNotifier, Notifier};
use crate::collaborators::questions::LlmQuestionGenerator;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::pipeline::catalog::StageCatalog;
use crate::pipeline::hooks::HookRunner;
use crate::pipeline::service::PipelineService;
use crate::pipeline::store::PgPipelineStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gradia API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgPipelineStore::new(db));

    // Stage catalog
    let catalog = match &config.stage_catalog_path {
        Some(path) => StageCatalog::from_json_file(path)
            .with_context(|| format!("Failed to load stage catalog from {path}"))?,
        None => StageCatalog::default_interview(),
    };
    info!("Stage catalog loaded ({} stages)", catalog.len());

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.collaborator_timeout)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Candidate notifications
    let notifier: Arc<dyn Notifier> = match &config.notification_url {
        Some(url) => {
            info!("Candidate notifications delivered to {url}");
            Arc::new(HttpNotifier::new(url.clone(), config.collaborator_timeout)?)
        }
        None => {
            info!("NOTIFICATION_URL not set; candidate notifications are only logged");
            Arc::new(LogNotifier)
        }
    };

    let hooks = HookRunner::new(
        notifier,
        Arc::new(LlmQuestionGenerator::new(llm.clone())),
        store.clone(),
        config.collaborator_timeout,
    );
    let pipelines = PipelineService::new(
        store,
        Arc::new(catalog),
        Arc::new(LlmAnswerEvaluator::new(llm)),
        hooks,
        config.collaborator_timeout,
    );

    // Build app state
    let state = AppState {
        pipelines: Arc::new(pipelines),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

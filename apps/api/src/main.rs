mod chat;
mod config;
mod errors;
mod llm_client;
mod routes;
mod state;

use anyhow::{Context, Result};
use minijinja::{path_loader, Environment};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::reply::ChatReplier;
use crate::config::Config;
use crate::llm_client::{ChatCompletion, LlmClient, LlmSettings};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing API_KEY)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Shalom Bot v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(LlmSettings::from_config(&config))
        .context("Failed to build LLM HTTP client")?;
    info!(
        "LLM client initialized (model: {}, endpoint: {})",
        llm.model(),
        config.completions_url()
    );

    if config.probe_on_startup {
        let report = llm.probe().await;
        if report.reachable {
            info!("LLM API reachable ({}ms)", report.latency_ms);
        } else {
            // Keep serving: quick replies and apologies still work without the API.
            warn!(
                status = ?report.status,
                error = ?report.error,
                "LLM API probe failed; chat will fall back to apologies until it recovers"
            );
        }
    }

    // Template environment for the chat page
    let mut templates = Environment::new();
    templates.set_loader(path_loader(config.templates_dir.clone()));
    info!("Templates loaded from '{}'", config.templates_dir);

    // Build app state
    let state = AppState {
        replier: ChatReplier::new(Arc::new(llm), &config.whatsapp_url),
        config: config.clone(),
        templates: Arc::new(templates),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // ManyChat and the web page call from other origins

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, initiating shutdown...");
}

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use telecare_core::CoreConfig;

/// Main entry point for the telecare service
///
/// Resolves configuration from the environment once, builds the flag store, session resolver
/// and model orchestrator, and serves the gated REST API.
///
/// # Environment Variables
/// - `TELECARE_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `TELECARE_FLAG_STORE`: `memory`, `file:<path>` or `rest:<url>` (default: `memory`)
/// - `TELECARE_FLAG_STORE_KEY`: API key for the REST flag store
/// - `TELECARE_SESSION_PUBLIC_KEY`: session verification key (PEM, path or base64)
/// - `TELECARE_MAX_REQUEST_BYTES`: request body cap
/// - `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL`: model endpoint
/// - `TELECARE_MODEL_COOLDOWN_SECS`, `TELECARE_MODEL_MAX_ATTEMPTS`,
///   `TELECARE_MODEL_BACKOFF_SECS`, `TELECARE_MODEL_TIMEOUT_SECS`: call pacing
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - any configuration value is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("telecare=info".parse()?)
                .add_directive("telecare_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("telecare_core=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("TELECARE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let cfg = CoreConfig::from_lookup(|name| std::env::var(name).ok())?;

    let flags = cfg.flag_store().build()?;
    let sessions = cfg.session_resolver()?;
    let orchestrator = Arc::new(cfg.orchestrator()?);

    if !cfg.has_session_key() {
        tracing::warn!("TELECARE_SESSION_PUBLIC_KEY is not set; every request is anonymous");
    }
    if cfg.model().api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; analysis endpoints will answer 500");
    }

    tracing::info!(
        flag_store = %cfg.flag_store().describe(),
        model = %cfg.model().model,
        cooldown_secs = cfg.cooldown().as_secs(),
        "configuration resolved"
    );

    let state = AppState::new(flags, sessions, orchestrator)
        .with_limits(*cfg.upload_limits(), cfg.max_request_bytes());
    let app = router(state);

    tracing::info!("++ Starting telecare REST on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("-- Shutting down telecare REST");
}

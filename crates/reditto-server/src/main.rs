//! Binary entrypoint for the reditto HTTP server.
//!
//! Configuration comes from environment variables; see [`reditto_server::config`].

use tracing_subscriber::EnvFilter;

use reditto_server::config::ServerConfig;
use reditto_server::router::build_router;
use reditto_server::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reditto_server=info,tower_http=info")),
        )
        .init();

    if let Err(err) = run().await {
        tracing::error!("reditto server failed: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        origins = ?config.allowed_origins,
        "reditto server starting on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("could not install Ctrl+C handler; shutdown signal disabled");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

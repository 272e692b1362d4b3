use std::env;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use school_erp::app::{app, AppState};
use school_erp::config::config;
use school_erp::{is_development, is_production};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("school_erp=info,tower_http=info")),
        )
        .init();

    let config = config();
    tracing::info!("Starting School ERP in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        if is_production!() {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        tracing::warn!("JWT_SECRET is not set; every token-guarded route will answer 500");
    } else if is_development!() && env::var("JWT_SECRET").is_err() {
        tracing::warn!("Using the built-in development JWT secret");
    }

    let state = AppState::from_config(config.clone());
    let db = state.db.clone();

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("School ERP listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close_all().await;
    tracing::info!("Connection pools closed, shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

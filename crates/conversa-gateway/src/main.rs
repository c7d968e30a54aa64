use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

mod app;
mod http;
mod ws;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conversa_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("CONVERSA_CONFIG").ok();
    let config = conversa_core::ConversaConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("config load failed ({}), using defaults", e);
        conversa_core::ConversaConfig::default()
    });
    let config = Arc::new(config);
    let store = Arc::new(conversa_store::Store::from_database_url(&config.database.url)?);

    let bind = config.host.clone();
    let port = config.port;

    let turns = conversa_orchestrator::TurnManager::new(store.clone(), config.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(conversa_orchestrator::sweeper::run(turns, shutdown_rx));

    let state = Arc::new(app::AppState::new(config, store));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("conversa gateway listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

use anyhow::{Context, Result};
use rollcall_store::SqliteStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod error;
mod records;
mod routes;
mod session;
mod state;
mod views;

use config::Config;
use engine::{spawn_engine, EngineTimeouts, HardwareBackend};
use session::{Credentials, SessionStore};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("rollcalld starting");

    let config = Config::from_env();

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path.display()))?;

    let engine_config = config.clone();
    let engine = spawn_engine(
        move || HardwareBackend::load(&engine_config),
        EngineTimeouts::from_config(&config),
    )
    .await
    .context("starting capture engine")?;

    let state = AppState::new(
        Arc::new(store),
        engine,
        SessionStore::new(config.session_ttl),
        Credentials {
            username: config.admin_user.clone(),
            password: config.admin_password.clone(),
        },
    );

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tracing::info!(addr = %config.bind, "rollcalld ready");

    axum::serve(listener, routes::build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("rollcalld shutting down");
    Ok(())
}

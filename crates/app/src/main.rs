//! Anju - resettlement housing selection host
//!
//! Runs the selection dataset, the 3-minute session timer and the TCP
//! server that collaborator stations connect to.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod gateway;
mod seed;
mod session_runtime;
mod state;

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Anju selection host");

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");

    if let Err(e) = runtime.block_on(run()) {
        tracing::error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> anju_core::Result<()> {
    let config_path = state::AppState::config_path()?;
    let config = config::AppConfig::load(&config_path)?;

    let app_state = Arc::new(state::AppState::new(&config)?);

    {
        let db = app_state.db.lock().unwrap();
        if config.seed_demo_data {
            seed::seed_if_empty(&db)?;
        }
        seed::bootstrap_admin(&db, &config)?;
        db.operators().cleanup_expired_sessions()?;
    }

    let (_events, timer_task) = session_runtime::spawn(app_state.clone());

    let gateway = Arc::new(gateway::HostGateway::new(app_state));
    let server = anju_net::Server::start(config.port, gateway)
        .await
        .map_err(|e| anju_core::Error::Io(std::io::Error::other(e.to_string())))?;
    tracing::info!(addr = %server.addr(), "Collaborator stations may connect");

    tokio::signal::ctrl_c()
        .await
        .map_err(anju_core::Error::Io)?;
    tracing::info!("Shutting down");
    server.shutdown();
    timer_task.abort();
    Ok(())
}

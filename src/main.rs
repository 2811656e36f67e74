use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;

mod api;
mod config;
mod generation;
mod llm;
mod models;
mod prompt;
mod state;
mod utils;

use config::CONFIG;
use state::AppState;
use utils::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let _logging_guards = init_logging();

    let state = Arc::new(AppState::new());
    let app = api::create_app(state);

    let listener = tokio::net::TcpListener::bind(&CONFIG.server_addr).await?;
    info!("Lighting director API listening on {}", CONFIG.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received, stopping server");
}

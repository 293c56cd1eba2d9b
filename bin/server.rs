// Rent Ledger - Web Server

use anyhow::{Context, Result};
use rent_ledger::api::{router, AppState};
use rent_ledger::config::AppConfig;
use rent_ledger::open_database;
use rent_ledger::telemetry::init_telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_telemetry(&config.log);

    // One connection for the whole process, handed to every request through state
    let conn = open_database(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))?;

    let state = AppState::new(conn, config.ledger.range_policy);
    let app = router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        %addr,
        range_policy = config.ledger.range_policy.as_str(),
        "rent ledger server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

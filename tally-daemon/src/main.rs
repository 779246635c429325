mod api;
mod convert;
mod db;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Result, ensure};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tally_core::db::Database;

#[derive(Parser, Debug, Clone)]
struct Args {
    /// Directory path for storing ledger data in a SQLite database.
    #[arg(long, env = "TALLY_DATA_DIR")]
    tally_data_dir: PathBuf,

    /// Network address and port for the JSON API to be served on.
    #[arg(long, env = "API_BIND", default_value = "0.0.0.0:8080")]
    api_bind: SocketAddr,

    /// The log level for the tally daemon
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Clone)]
struct AppState {
    db: Database,
}

async fn shutdown_signal() {
    tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("Failed to install SIGTERM handler")
        .recv()
        .await;
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(args.log_level.clone()))
        .init();

    ensure!(
        args.tally_data_dir.is_dir(),
        "Tally data dir is not a directory"
    );

    info!("Starting Tally Daemon...");

    let db = Database::new(&args.tally_data_dir, tally_daemon_db::MIGRATIONS)?;

    let app_state = AppState { db };

    let runtime = tokio::runtime::Runtime::new()?;

    let ct = tokio_util::sync::CancellationToken::new();

    let api_task = runtime.spawn(api::run_api(args.api_bind, app_state, ct.clone()));

    runtime.block_on(shutdown_signal());

    ct.cancel();

    if let Err(e) = runtime.block_on(api_task) {
        warn!(?e, "Failed to join API task");
    }

    info!("Graceful shutdown complete");

    Ok(())
}

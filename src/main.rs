//! Task Manager API server
//!
//! REST API over a SQLite task store with hash-based duplicate detection.

use anyhow::{Context, Result};
use clap::Parser;
use task_manager_api::cli::Cli;
use task_manager_api::config::Config;
use task_manager_api::db::Database;
use task_manager_api::logging::{self, LogTarget};
use task_manager_api::server::{self, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Pick up a local .env before reading the environment.
    dotenv::dotenv().ok();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = Config::resolve(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    info!(
        "Starting Task Manager API v{}",
        env!("CARGO_PKG_VERSION")
    );

    let database_url = config.database_url()?;
    let db = Database::connect(database_url).context("Failed to connect to database")?;
    info!(tasks = db.count_tasks()?, "Database connected successfully");

    let listener = server::bind(&config.server)
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;

    server::serve(
        listener,
        AppState::new(db.clone()),
        server::shutdown_signal(),
    )
    .await?;

    db.close()?;

    Ok(())
}

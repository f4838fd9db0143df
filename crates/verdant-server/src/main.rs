//! Verdant Server: Application entry point.

use tracing_subscriber::EnvFilter;
use verdant_db::DbManager;
use verdant_server::{App, ServerConfig, ServerError};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let loaded_env = ServerConfig::load_env_file()?;
    let config = ServerConfig::load()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| ServerError::Logging(e.to_string()))?;
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    tracing::info!(loaded_env, "Starting Verdant server...");

    let db = DbManager::connect(&config.database).await?;
    verdant_db::run_migrations(db.client()).await?;

    let _app = App::new(db.client().clone(), config.workflow.clone());
    tracing::info!(
        enforce_file_prerequisites = config.workflow.enforce_file_prerequisites,
        "Workflow services ready"
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("Verdant server stopped.");
    Ok(())
}

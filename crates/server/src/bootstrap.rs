use std::sync::Arc;

use secrecy::ExposeSecret;
use talenthub_core::config::{AppConfig, ConfigError, DirectoryMode, LoadOptions};
use talenthub_core::directory::{DirectoryClient, FixtureDirectoryClient, HttpDirectoryClient};
use talenthub_core::routes::{RouteError, RouteTable};
use talenthub_core::workflow::WorkflowEngine;
use talenthub_db::repositories::{RepositoryError, RouteRepository, SqlRouteRepository};
use talenthub_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<WorkflowEngine>,
    pub directory_client: Arc<dyn DirectoryClient>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("route configuration could not be loaded: {0}")]
    RouteLoad(#[source] RepositoryError),
    #[error("route configuration is invalid: {0}")]
    RouteValidation(#[from] RouteError),
    #[error("directory configuration is incomplete: {0}")]
    Directory(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    // Gapped or malformed routes are refused here, before the engine ever
    // sees them.
    let steps = SqlRouteRepository::new(db_pool.clone())
        .list_all()
        .await
        .map_err(BootstrapError::RouteLoad)?;
    let step_count = steps.len();
    let routes = RouteTable::new(steps)?;
    info!(
        event_name = "system.bootstrap.routes_loaded",
        step_count = step_count,
        "approval routes validated"
    );

    let directory_client = build_directory_client(&config)?;
    info!(
        event_name = "system.bootstrap.directory_selected",
        mode = ?config.directory.mode,
        "directory client selected"
    );

    Ok(Application {
        config,
        db_pool,
        engine: Arc::new(WorkflowEngine::new(routes)),
        directory_client,
    })
}

fn build_directory_client(
    config: &AppConfig,
) -> Result<Arc<dyn DirectoryClient>, BootstrapError> {
    match config.directory.mode {
        DirectoryMode::Fixture => Ok(Arc::new(FixtureDirectoryClient::default())),
        DirectoryMode::Http => {
            let base_url = config
                .directory
                .base_url
                .as_deref()
                .ok_or_else(|| BootstrapError::Directory("base_url is not set".to_string()))?;
            let token = config
                .directory
                .token
                .as_ref()
                .ok_or_else(|| BootstrapError::Directory("token is not set".to_string()))?;
            Ok(Arc::new(HttpDirectoryClient::new(base_url, token.expose_secret())))
        }
    }
}

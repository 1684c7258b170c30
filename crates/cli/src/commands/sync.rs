use chrono::Utc;
use secrecy::ExposeSecret;

use crate::commands::{build_runtime, CommandResult};
use talenthub_core::config::{AppConfig, ConfigOverrides, DirectoryMode, LoadOptions};
use talenthub_core::directory::{DirectoryClient, FixtureDirectoryClient, HttpDirectoryClient};
use talenthub_db::{connect_with_config, migrations, run_sync};

pub fn run(live: bool) -> CommandResult {
    let overrides = ConfigOverrides {
        directory_mode: live.then_some(DirectoryMode::Http),
        ..ConfigOverrides::default()
    };
    let config = match AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "sync",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let client: Box<dyn DirectoryClient> = match config.directory.mode {
        DirectoryMode::Fixture => Box::new(FixtureDirectoryClient::default()),
        DirectoryMode::Http => {
            // Validation guarantees both values for http mode.
            let (Some(base_url), Some(token)) =
                (config.directory.base_url.as_deref(), config.directory.token.as_ref())
            else {
                return CommandResult::failure(
                    "sync",
                    "config_validation",
                    "directory.base_url and directory.token are required for http mode",
                    2,
                );
            };
            Box::new(HttpDirectoryClient::new(base_url, token.expose_secret()))
        }
    };

    let runtime = match build_runtime("sync") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let outcome = run_sync(&pool, client.as_ref(), Utc::now())
            .await
            .map_err(|error| ("directory_sync", error.to_string(), 5u8))?;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(outcome)
    });

    match result {
        Ok(outcome) => CommandResult::success(
            "sync",
            format!(
                "directory sync completed: created {}, updated {}, deactivated {}",
                outcome.created, outcome.updated, outcome.deactivated
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("sync", error_class, message, exit_code)
        }
    }
}

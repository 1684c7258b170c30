use serde::Serialize;

use talenthub_core::config::{AppConfig, DirectoryMode, LoadOptions, LogFormat};

#[derive(Debug, Serialize)]
struct ConfigView {
    database: DatabaseView,
    server: ServerView,
    directory: DirectoryView,
    logging: LoggingView,
}

#[derive(Debug, Serialize)]
struct DatabaseView {
    url: String,
    max_connections: u32,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ServerView {
    bind_address: String,
    port: u16,
    graceful_shutdown_secs: u64,
}

#[derive(Debug, Serialize)]
struct DirectoryView {
    mode: DirectoryMode,
    base_url: Option<String>,
    token: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct LoggingView {
    level: String,
    format: LogFormat,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return format!("{{\"status\":\"error\",\"message\":\"{error}\"}}");
        }
    };

    let view = ConfigView {
        database: DatabaseView {
            url: config.database.url,
            max_connections: config.database.max_connections,
            timeout_secs: config.database.timeout_secs,
        },
        server: ServerView {
            bind_address: config.server.bind_address,
            port: config.server.port,
            graceful_shutdown_secs: config.server.graceful_shutdown_secs,
        },
        directory: DirectoryView {
            mode: config.directory.mode,
            base_url: config.directory.base_url,
            token: config.directory.token.as_ref().map(|_| "<redacted>"),
        },
        logging: LoggingView { level: config.logging.level, format: config.logging.format },
    };

    serde_json::to_string_pretty(&view)
        .unwrap_or_else(|error| format!("{{\"status\":\"error\",\"message\":\"{error}\"}}"))
}

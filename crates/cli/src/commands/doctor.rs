use serde::Serialize;

use crate::commands::build_runtime;
use talenthub_core::config::{AppConfig, LoadOptions};
use talenthub_core::routes::RouteTable;
use talenthub_db::repositories::{RouteRepository, SqlRouteRepository};
use talenthub_db::connect_with_config;

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: &'static str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    status: &'static str,
    checks: Vec<DoctorCheck>,
}

fn passed(name: &'static str, detail: impl Into<String>) -> DoctorCheck {
    DoctorCheck { name, status: "ok", detail: detail.into() }
}

fn failed(name: &'static str, detail: impl Into<String>) -> DoctorCheck {
    DoctorCheck { name, status: "error", detail: detail.into() }
}

pub fn run(json: bool) -> String {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(passed("config", "configuration loaded and validated"));
            Some(config)
        }
        Err(error) => {
            checks.push(failed("config", error.to_string()));
            None
        }
    };

    if let Some(config) = config {
        match build_runtime("doctor") {
            Ok(runtime) => runtime.block_on(async {
                match connect_with_config(&config.database).await {
                    Ok(pool) => {
                        checks.push(passed("database", "connection established"));

                        match SqlRouteRepository::new(pool.clone()).list_all().await {
                            Ok(steps) => {
                                let step_count = steps.len();
                                match RouteTable::new(steps) {
                                    Ok(_) => checks.push(passed(
                                        "routes",
                                        format!("{step_count} route steps validated"),
                                    )),
                                    Err(error) => checks.push(failed("routes", error.to_string())),
                                }
                            }
                            Err(error) => {
                                checks.push(failed("routes", error.to_string()));
                            }
                        }

                        pool.close().await;
                    }
                    Err(error) => {
                        checks.push(failed("database", error.to_string()));
                    }
                }
            }),
            Err(failure) => {
                checks.push(failed("runtime", failure.output));
            }
        }
    }

    let all_ok = checks.iter().all(|check| check.status == "ok");
    let report = DoctorReport { status: if all_ok { "ready" } else { "degraded" }, checks };

    if json {
        serde_json::to_string_pretty(&report)
            .unwrap_or_else(|error| format!("{{\"status\":\"error\",\"message\":\"{error}\"}}"))
    } else {
        let mut lines = vec![format!("status: {}", report.status)];
        for check in &report.checks {
            lines.push(format!("  [{}] {}: {}", check.status, check.name, check.detail));
        }
        lines.join("\n")
    }
}

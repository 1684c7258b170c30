use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};

use crate::commands::{build_runtime, CommandResult};
use talenthub_core::analytics::RequestFilters;
use talenthub_core::config::{AppConfig, LoadOptions};
use talenthub_core::domain::request::RequestType;
use talenthub_core::report::{build_rows, build_structured, render_csv};
use talenthub_core::routes::RouteTable;
use talenthub_db::repositories::{
    EmployeeRepository, RequestRepository, RouteRepository, SqlEmployeeRepository,
    SqlRequestRepository, SqlRouteRepository,
};
use talenthub_db::connect_with_config;

#[derive(Debug)]
pub struct ReportArgs {
    pub format: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub request_type: Option<String>,
    pub output: Option<PathBuf>,
}

fn parse_bound(raw: Option<&str>, flag: &str) -> Result<Option<NaiveDate>, CommandResult> {
    raw.map(|value| {
        value.parse().map_err(|_| {
            CommandResult::failure(
                "report",
                "invalid_argument",
                format!("--{flag} expects a YYYY-MM-DD date, got `{value}`"),
                2,
            )
        })
    })
    .transpose()
}

pub fn run(args: ReportArgs) -> CommandResult {
    if !matches!(args.format.as_str(), "csv" | "json") {
        return CommandResult::failure(
            "report",
            "invalid_argument",
            format!("--format expects csv or json, got `{}`", args.format),
            2,
        );
    }

    let created_from = match parse_bound(args.from.as_deref(), "from") {
        Ok(bound) => bound,
        Err(failure) => return failure,
    };
    let created_to = match parse_bound(args.to.as_deref(), "to") {
        Ok(bound) => bound,
        Err(failure) => return failure,
    };
    let request_type = match args.request_type.as_deref() {
        None => None,
        Some(raw) => match RequestType::parse(raw) {
            Some(parsed) => Some(parsed),
            None => {
                return CommandResult::failure(
                    "report",
                    "invalid_argument",
                    format!("--type expects vacation or business_trip, got `{raw}`"),
                    2,
                );
            }
        },
    };
    let filters = RequestFilters { created_from, created_to, request_type, status: None };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "report",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match build_runtime("report") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let rendered = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let steps = SqlRouteRepository::new(pool.clone())
            .list_all()
            .await
            .map_err(|error| ("route_load", error.to_string(), 5u8))?;
        let routes = RouteTable::new(steps)
            .map_err(|error| ("route_validation", error.to_string(), 5u8))?;

        let requests = SqlRequestRepository::new(pool.clone())
            .list()
            .await
            .map_err(|error| ("request_load", error.to_string(), 5u8))?;
        let employees: HashMap<_, _> = SqlEmployeeRepository::new(pool.clone())
            .list(false)
            .await
            .map_err(|error| ("employee_load", error.to_string(), 5u8))?
            .into_iter()
            .map(|employee| (employee.id.clone(), employee))
            .collect();

        pool.close().await;

        let rows = build_rows(&requests, &employees, &routes, &filters);
        match args.format.as_str() {
            "csv" => render_csv(&rows).map_err(|error| ("render", error.to_string(), 5u8)),
            _ => {
                let structured = build_structured(&rows, &filters, Utc::now());
                serde_json::to_string_pretty(&structured)
                    .map_err(|error| ("render", error.to_string(), 5u8))
            }
        }
    });

    let rendered = match rendered {
        Ok(rendered) => rendered,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("report", error_class, message, exit_code);
        }
    };

    match args.output {
        Some(path) => match std::fs::write(&path, &rendered) {
            Ok(()) => CommandResult::success(
                "report",
                format!("report written to {}", path.display()),
            ),
            Err(error) => CommandResult::failure(
                "report",
                "io",
                format!("could not write {}: {error}", path.display()),
                4,
            ),
        },
        // Raw report straight to stdout so it can be piped.
        None => CommandResult { exit_code: 0, output: rendered },
    }
}

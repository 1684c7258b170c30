use clap::Parser;
use serde_json::Value;

use talenthub_cli::commands::CommandResult;
use talenthub_cli::Cli;

#[test]
fn success_envelope_is_machine_readable() {
    let result = CommandResult::success("migrate", "applied pending migrations");
    assert_eq!(result.exit_code, 0);

    let payload: Value = serde_json::from_str(&result.output).expect("valid json");
    assert_eq!(payload["command"], "migrate");
    assert_eq!(payload["status"], "ok");
    assert!(payload["error_class"].is_null());
    assert_eq!(payload["message"], "applied pending migrations");
}

#[test]
fn failure_envelope_carries_error_class_and_exit_code() {
    let result = CommandResult::failure("seed", "db_connectivity", "no such file", 4);
    assert_eq!(result.exit_code, 4);

    let payload: Value = serde_json::from_str(&result.output).expect("valid json");
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "db_connectivity");
}

#[test]
fn cli_accepts_every_subcommand() {
    for args in [
        vec!["talenthub", "migrate"],
        vec!["talenthub", "seed"],
        vec!["talenthub", "sync"],
        vec!["talenthub", "sync", "--live"],
        vec!["talenthub", "report"],
        vec!["talenthub", "report", "--format", "json", "--type", "vacation"],
        vec![
            "talenthub",
            "report",
            "--from",
            "2026-01-01",
            "--to",
            "2026-06-30",
            "--output",
            "report.csv",
        ],
        vec!["talenthub", "config"],
        vec!["talenthub", "doctor"],
        vec!["talenthub", "doctor", "--json"],
    ] {
        Cli::try_parse_from(args.iter().copied()).unwrap_or_else(|error| {
            panic!("arguments {args:?} should parse: {error}");
        });
    }
}

#[test]
fn cli_rejects_unknown_subcommands() {
    assert!(Cli::try_parse_from(["talenthub", "teleport"]).is_err());
}

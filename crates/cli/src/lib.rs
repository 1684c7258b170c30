pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "talenthub",
    about = "TalentHub operator CLI",
    long_about = "Operate TalentHub migrations, demo seeding, directory sync, report export, \
                  config inspection, and readiness validation.",
    after_help = "Examples:\n  talenthub migrate\n  talenthub seed\n  talenthub sync\n  talenthub report --format csv\n  talenthub doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset (idempotent)")]
    Seed,
    #[command(
        about = "Synchronize employees from the HR directory (fixture or live, per config)"
    )]
    Sync {
        #[arg(long, help = "Force the live HTTP directory regardless of the configured mode")]
        live: bool,
    },
    #[command(about = "Export the approval report over approved requests")]
    Report {
        #[arg(long, default_value = "csv", help = "Output format: csv or json")]
        format: String,
        #[arg(long, help = "Inclusive lower bound on created_at (YYYY-MM-DD)")]
        from: Option<String>,
        #[arg(long, help = "Inclusive upper bound on created_at (YYYY-MM-DD)")]
        to: Option<String>,
        #[arg(long = "type", help = "Filter by request type: vacation or business_trip")]
        request_type: Option<String>,
        #[arg(long, help = "Write the report to a file instead of stdout")]
        output: Option<PathBuf>,
    },
    #[command(
        about = "Inspect effective configuration values with source layering and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, and route configuration")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Sync { live } => commands::sync::run(live),
        Command::Report { format, from, to, request_type, output } => commands::report::run(
            commands::report::ReportArgs { format, from, to, request_type, output },
        ),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

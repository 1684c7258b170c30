use std::process::ExitCode;

fn main() -> ExitCode {
    talenthub_cli::run()
}

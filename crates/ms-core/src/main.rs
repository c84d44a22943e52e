use clap::Parser;
use ms_core::{commands, logging, Cli};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);
    tracing::debug!(format = %cli.format, "starting modsync");
    commands::run(&cli).into()
}

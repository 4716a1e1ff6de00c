//! CLI entry point and dispatch logic, grounded on teacher's
//! `cli::run::run`: parse arguments, discover configuration, initialize
//! logging, dispatch to a command, and map any error to an exit code.

use clap::Parser;
use sds_utils::exit_codes::{ExitCode, ToExitCode};

use super::args::{Cli, Commands};
use super::commands;

pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let config = sds_config::discover(cli.config.as_deref()).map_err(|err| {
        eprintln!("sds-rulemgr: config error: {err}");
        err.to_exit_code()
    })?;

    if let Err(err) = sds_utils::logging::init(&config.logging.level, config.logging.filename.as_deref()) {
        eprintln!("sds-rulemgr: failed to initialize logging: {err}");
        return Err(ExitCode::INTERNAL);
    }

    let result = match &cli.command {
        Commands::Collect(args) => commands::collect(args, &config),
        Commands::Run(args) => commands::run_rules(args, &config),
        Commands::Delete(args) => commands::delete(args, &config),
    };

    result.map_err(|err| {
        tracing::error!(%err, "command failed");
        err.to_exit_code()
    })
}

pub mod cli;
pub mod commands;
pub mod error;
pub mod run_loop;

use cli::{Cli, Commands};
use clustertest_core::logging::{self, LogLevel};
use error::CliError;

/// Dispatches a parsed command line and returns the process exit code.
pub fn run(cli: Cli) -> Result<i32, CliError> {
    logging::set_log_level_from_env();
    if cli.verbose > 0 {
        logging::set_log_level(LogLevel::from_verbosity(cli.verbose));
    }
    logging::init_logger(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Run(args) => commands::run::handle_run(args),
        Commands::Validate(args) => commands::validate::handle_validate(args).map(|()| 0),
        Commands::Render(args) => commands::render::handle_render(args).map(|()| 0),
    }
}

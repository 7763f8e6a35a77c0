use terrasched_core::logging;

mod cli;

use crate::cli::CliCommand;

fn main() {
    // Initialize logging as early as possible; fall back to stderr if the
    // state directory is not writable.
    if let Err(err) = logging::init_logging() {
        match logging::init_logging_stderr() {
            Ok(()) => tracing::warn!("file logging unavailable, using stderr: {err:#}"),
            Err(fallback) => eprintln!("terrasched: logging disabled: {err:#}; {fallback:#}"),
        }
    }

    if let Err(err) = CliCommand::run_from_args() {
        eprintln!("terrasched error: {:#}", err);
        std::process::exit(1);
    }
}

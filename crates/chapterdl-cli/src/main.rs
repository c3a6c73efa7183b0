use chapterdl_core::logging;
use clap::Parser;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Verbose runs log to stderr; otherwise the log file, falling back to stderr.
    if cli.verbose {
        logging::init_logging_stderr(true);
    } else if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr(false);
        tracing::warn!("file logging unavailable, using stderr: {e:#}");
    }

    match cli.run().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("chapterdl error: {:#}", err);
            std::process::exit(1);
        }
    }
}

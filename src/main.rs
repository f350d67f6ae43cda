use clap::Parser;
use std::process::ExitCode;

use storefront_rs::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match cli::load_and_merge_config(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = cli::init_logger_from_settings(&settings) {
        eprintln!("Logger initialization error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match cli::execute_command(&cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", anyhow::Error::from(e));
            ExitCode::FAILURE
        }
    }
}

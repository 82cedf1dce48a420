mod cli;
mod config;
mod db;
mod error;
mod logging;
mod models;

use std::process::ExitCode;

use clap::Parser;
use tracing::warn;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::db::ContactStore;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.debug).ok();

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Open the connection
    let mut store = match ContactStore::connect(&config).await {
        Ok(store) => store,
        Err(err) => {
            eprintln!("Incorrect database credentials or parameters: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let command = cli.command.unwrap_or(Command::Demo);
    let result = cli::run(&mut store, command).await;

    // The connection is closed whether or not the command succeeded
    if let Err(err) = store.close().await {
        warn!(error = %err, "failed to close database connection");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

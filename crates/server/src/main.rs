use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error};

use arrmate::cli::{Cli, Command, SonarrCommand};
use arrmate::commands::{
    open_pool, run_config, run_server, sonarr_search, sonarr_sync, sonarr_sync_once,
};
use arrmate::logging::init_logging;
use arrmate_core::{load_config, validate_config, Config};

/// Exit status for any failed command.
const FAILURE_EXIT_CODE: u8 = 100;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            println!("Error: {:#}", e);
            ExitCode::from(FAILURE_EXIT_CODE)
        }
    }
}

fn load(cli: &Cli) -> Result<Config> {
    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = &cli.connect {
        config.database.path = path.clone();
    }
    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load(&cli)?;

    // Initialize logging
    init_logging(cli.log_level.as_deref(), &config.logging);
    debug!("Database path: {:?}", config.database.path);

    let pool = open_pool(&config)?;
    let mut stdout = io::stdout();

    let result = match &cli.command {
        Command::Server => return run_server(config, pool).await,
        Command::Config(command) => run_config(&pool, command, &mut stdout),
        Command::Sonarr(SonarrCommand::Search { term }) => {
            sonarr_search(&pool, &term.join(" "), &mut stdout).map(|_| ())
        }
        Command::Sonarr(SonarrCommand::Sync) => {
            let sync = sonarr_sync(&config, &pool)?;
            sonarr_sync_once(&sync, &mut stdout).await
        }
    };

    pool.close();
    result
}

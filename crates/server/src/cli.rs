//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "arrmate", version, about = "Chat bot bridge for media management services")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "ARRMATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file, overrides `database.path`.
    #[arg(long = "connect", global = true, value_name = "PATH")]
    pub connect: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset, e.g. `info` or `arrmate=debug`.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API and the catalog sync job.
    Server,
    /// Read and write runtime configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Sonarr catalog commands.
    #[command(subcommand)]
    Sonarr(SonarrCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the value of each key.
    Get {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Set one or more `key=value` pairs.
    Set {
        #[arg(required = true, value_parser = parse_assignment)]
        pairs: Vec<(String, String)>,
    },
    /// Print every configured `key=value`.
    List,
    /// Remove keys.
    Delete {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Interactive SQL shell against the database.
    Shell,
}

#[derive(Debug, Subcommand)]
pub enum SonarrCommand {
    /// Search the local mirror by title.
    Search {
        #[arg(required = true, num_args = 1..)]
        term: Vec<String>,
    },
    /// Pull a fresh snapshot from Sonarr now.
    Sync,
}

/// Parse `key=value`. The value may itself contain `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

//! Subcommand implementations.
//!
//! Each command opens the pool itself; output goes to the writer it is given
//! so the commands can be exercised without a terminal.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use arrmate_core::{
    metrics::MetricsObserver, CatalogSource, CatalogSync, Config, ConfigStore, Pool, PoolOptions,
    Schema, SeriesMirror, SeriesSearch, SonarrSource, SyncJob, SyncOutcome,
};

use crate::api::create_router;
use crate::cli::ConfigCommand;
use crate::shell::run_shell;
use crate::state::AppState;

/// Scheduler tag of the Sonarr sync job.
pub const SONARR_JOB_TAG: &str = "sonarr";

/// Open the configured database, applying pending migrations.
pub fn open_pool(config: &Config) -> Result<Pool> {
    let options = PoolOptions::default()
        .with_max_size(config.database.pool_size)
        .with_acquire_timeout(config.database.acquire_timeout())
        .with_observer(Arc::new(MetricsObserver));
    Pool::open(&config.database.path, &Schema::bundled(), options)
        .with_context(|| format!("Failed to open database {:?}", config.database.path))
}

/// Build the Sonarr synchronizer over `pool`.
pub fn sonarr_sync(config: &Config, pool: &Pool) -> Result<Arc<CatalogSync>> {
    let source: Arc<dyn CatalogSource> = Arc::new(
        SonarrSource::new(config.sync.source_timeout()).context("Failed to build HTTP client")?,
    );
    Ok(Arc::new(CatalogSync::new(
        ConfigStore::new(pool.clone()),
        SeriesMirror::new(pool.clone()),
        source,
    )))
}

/// `config get|set|list|delete|shell`.
pub fn run_config<W: Write>(pool: &Pool, command: &ConfigCommand, out: &mut W) -> Result<()> {
    let store = ConfigStore::new(pool.clone());
    match command {
        ConfigCommand::Get { keys } => {
            for key in keys {
                let value = store.get(key)?.unwrap_or_default();
                writeln!(out, "{}={}", key, value)?;
            }
        }
        ConfigCommand::Set { pairs } => {
            for (key, value) in pairs {
                store.set(key, value)?;
                info!(key = %key, "Config key set");
            }
        }
        ConfigCommand::List => {
            let mut entries = store.entries()?;
            entries.sort();
            for (key, value) in entries {
                writeln!(out, "{}={}", key, value)?;
            }
        }
        ConfigCommand::Delete { keys } => {
            for key in keys {
                if store.delete(key)? == 0 {
                    writeln!(out, "{}: not set", key)?;
                }
            }
        }
        ConfigCommand::Shell => config_shell(pool, io::stdin().lock(), out)?,
    }
    Ok(())
}

/// Interactive SQL shell on one pooled connection.
///
/// The connection goes back to the pool when the shell exits.
pub fn config_shell<R: io::BufRead, W: Write>(pool: &Pool, input: R, out: &mut W) -> Result<()> {
    pool.with_connection(|conn| run_shell(conn, input, out, true))??;
    Ok(())
}

/// `sonarr search <term>`: write each chunk to `out`.
pub fn sonarr_search<W: Write>(pool: &Pool, term: &str, out: &mut W) -> Result<usize> {
    let search = SeriesSearch::new(pool.clone());
    let mut write_error = None;
    let matches = search.run(term, |chunk| {
        if write_error.is_some() {
            return;
        }
        let result = out.write_all(chunk.as_bytes()).and_then(|_| {
            if chunk.ends_with('\n') {
                Ok(())
            } else {
                out.write_all(b"\n")
            }
        });
        if let Err(e) = result {
            write_error = Some(e);
        }
    })?;
    if let Some(e) = write_error {
        return Err(e).context("Failed to write search results");
    }
    out.flush()?;
    Ok(matches)
}

/// `sonarr sync`: one run in the foreground.
pub async fn sonarr_sync_once<W: Write>(sync: &Arc<CatalogSync>, out: &mut W) -> Result<()> {
    match sync.run_once().await? {
        SyncOutcome::Replaced(count) => writeln!(out, "synced {} series", count)?,
        SyncOutcome::Skipped => writeln!(out, "sync already running")?,
    }
    Ok(())
}

/// `server`: HTTP API plus the recurring sync job until Ctrl-C.
pub async fn run_server(config: Config, pool: Pool) -> Result<()> {
    let sync = sonarr_sync(&config, &pool)?;

    let job = SyncJob::new(SONARR_JOB_TAG, config.sync.interval(), Arc::clone(&sync));
    if config.sync.enabled {
        job.start();
    } else {
        info!("Sync job disabled in config");
    }

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(pool.clone(), sync));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error");

    info!("Server shutting down...");
    job.stop().await;
    pool.close();
    info!("Database closed");

    served
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use arrmate_core::LoggingConfig;

/// Pick the filter directive: `RUST_LOG`, then the CLI flag, then the config.
pub fn filter_directive(env: Option<String>, flag: Option<&str>, config: &LoggingConfig) -> String {
    env.filter(|v| !v.trim().is_empty())
        .or_else(|| flag.map(str::to_string))
        .unwrap_or_else(|| config.level.clone())
}

/// Install the global subscriber. Safe to call once per process.
pub fn init_logging(flag: Option<&str>, config: &LoggingConfig) {
    let directive = filter_directive(std::env::var("RUST_LOG").ok(), flag, config);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Database path is not empty
/// - Pool size and acquire timeout are at least 1
/// - Sync interval and source timeout are at least 1 second
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.database.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "database.path cannot be empty".to_string(),
        ));
    }
    if config.database.pool_size == 0 {
        return Err(ConfigError::ValidationError(
            "database.pool_size must be at least 1".to_string(),
        ));
    }
    if config.database.acquire_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "database.acquire_timeout_secs must be at least 1".to_string(),
        ));
    }
    if config.sync.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sync.interval_secs must be at least 1".to_string(),
        ));
    }
    if config.sync.source_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sync.source_timeout_secs must be at least 1".to_string(),
        ));
    }

    Ok(())
}

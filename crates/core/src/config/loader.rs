use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable prefix, e.g. `ARRMATE_DATABASE__PATH`.
pub const ENV_PREFIX: &str = "ARRMATE_";

/// Load configuration: defaults, then the optional file, then environment
/// variable overrides.
///
/// An explicitly named file that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[database]
pool_size = 2

[server]
port = 9000
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.pool_size, 2);
    }

    #[test]
    fn test_load_config_from_str_invalid() {
        let result = load_config_from_str("[database\npath = ");
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Some(Path::new("/nonexistent/arrmate.toml")));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_without_file_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = load_config(None).unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[database]
path = "/tmp/arrmate-test.sqlite"

[server]
host = "127.0.0.1"
port = 3000
"#
        )
        .unwrap();

        let config = load_config(Some(temp_file.path())).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(
            config.database.path.to_string_lossy(),
            "/tmp/arrmate-test.sqlite"
        );
        assert_eq!(config.sync.interval_secs, 300);
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "arrmate.toml",
                r#"
[sync]
interval_secs = 60

[logging]
level = "info"
"#,
            )?;
            jail.set_env("ARRMATE_SYNC__INTERVAL_SECS", "120");
            jail.set_env("ARRMATE_LOGGING__JSON", "true");

            let config = load_config(Some(Path::new("arrmate.toml"))).unwrap();
            assert_eq!(config.sync.interval_secs, 120);
            assert_eq!(config.logging.level, "info");
            assert!(config.logging.json);
            Ok(())
        });
    }
}

//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ManagerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the environment, and validate.
///
/// Without a path the defaults are used as the base.
pub fn load_config(path: Option<&Path>) -> Result<ManagerConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => ManagerConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<ManagerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Apply `SERVER_HOST`, `SERVER_PORT` and `LOG_LEVEL` on top of `config`.
pub fn apply_env_overrides<F>(config: &mut ManagerConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup("SERVER_HOST") {
        config.server.host = host;
    }
    if let Some(port) = lookup("SERVER_PORT") {
        config.server.port = port.parse().map_err(|_| ConfigError::Env {
            var: "SERVER_PORT",
            value: port,
        })?;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ManagerConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.expiration.interval_secs, 5);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn env_overrides_win() {
        let mut config = ManagerConfig::default();
        apply_env_overrides(&mut config, |var| match var {
            "SERVER_HOST" => Some("127.0.0.1".into()),
            "SERVER_PORT" => Some("8443".into()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.server.bind_address(), "127.0.0.1:8443");
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut config = ManagerConfig::default();
        let err = apply_env_overrides(&mut config, |var| {
            (var == "SERVER_PORT").then(|| "http".to_string())
        })
        .unwrap_err();

        assert!(matches!(err, ConfigError::Env { var: "SERVER_PORT", .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

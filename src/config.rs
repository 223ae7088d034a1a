use crate::modules::shifts::catalog::Catalog;
use std::{env, path::PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("{name} must be a channel id, got {value:?}")]
    InvalidId { name: &'static str, value: String },
    #[error("failed to read catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse catalog {path}: {source}")]
    CatalogParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("catalog {path} is invalid: {reason}")]
    CatalogInvalid { path: PathBuf, reason: String },
}

/// Process-wide settings. Per-guild settings live in the shift database.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub shift_log_channel: Option<u64>,
    pub service_log_channel: Option<u64>,
    pub catalog: Catalog,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let shift_log_channel = channel_var("SHIFT_LOG_CHANNEL_ID")?;
        let service_log_channel = channel_var("SERVICE_LOG_CHANNEL_ID")?;

        let catalog = match env::var("CATALOG_PATH") {
            Ok(path) => Catalog::load(PathBuf::from(path))?,
            Err(_) => {
                debug!("CATALOG_PATH not set, using built-in actions");
                Catalog::default()
            }
        };

        info!(
            "Loaded config: data dir {}, {} actions",
            data_dir.display(),
            catalog.actions.len()
        );

        Ok(Self {
            data_dir,
            shift_log_channel,
            service_log_channel,
            catalog,
        })
    }

    /// `DISCORD_TOKEN`, or the older `DISCORD_BOT_TOKEN`.
    pub fn token() -> Result<String, ConfigError> {
        pick_token(
            env::var("DISCORD_TOKEN").ok(),
            env::var("DISCORD_BOT_TOKEN").ok(),
        )
    }
}

fn pick_token(token: Option<String>, legacy: Option<String>) -> Result<String, ConfigError> {
    let usable = |t: Option<String>| t.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    match (usable(token), usable(legacy)) {
        (Some(token), _) => Ok(token),
        (None, Some(token)) => {
            debug!("Using DISCORD_BOT_TOKEN");
            Ok(token)
        }
        (None, None) => Err(ConfigError::Missing("DISCORD_TOKEN")),
    }
}

fn channel_var(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_channel_id(name, &value),
        Err(_) => Ok(None),
    }
}

/// Empty and `0` mean "not configured".
fn parse_channel_id(name: &'static str, value: &str) -> Result<Option<u64>, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    match value.parse::<u64>() {
        Ok(0) => Ok(None),
        Ok(id) => Ok(Some(id)),
        Err(_) => Err(ConfigError::InvalidId {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_blank_channel_ids_are_unset() {
        assert_eq!(parse_channel_id("X", "0").unwrap(), None);
        assert_eq!(parse_channel_id("X", "  ").unwrap(), None);
        assert_eq!(
            parse_channel_id("X", "123456789012345678").unwrap(),
            Some(123456789012345678)
        );
    }

    #[test]
    fn garbage_channel_id_is_an_error() {
        let err = parse_channel_id("SHIFT_LOG_CHANNEL_ID", "general").unwrap_err();
        assert!(err.to_string().contains("SHIFT_LOG_CHANNEL_ID"));
    }

    #[test]
    fn token_falls_back_to_legacy_name() {
        let pick = |a: Option<&str>, b: Option<&str>| {
            pick_token(a.map(String::from), b.map(String::from))
        };

        assert_eq!(pick(Some("new"), Some("old")).unwrap(), "new");
        assert_eq!(pick(None, Some("old")).unwrap(), "old");
        assert_eq!(pick(Some(" "), Some("old")).unwrap(), "old");
        assert!(matches!(
            pick(None, None),
            Err(ConfigError::Missing("DISCORD_TOKEN"))
        ));
    }
}

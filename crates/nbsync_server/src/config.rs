//! Configuration for the server

use anyhow::{Context, Result};
use nbsync_core::{default_log_level, DEFAULT_MAX_RENAME_ATTEMPTS};
use serde::{Deserialize, Serialize};
use std::{
    env,
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
};

pub use crate::http::HttpConfig;

/// Environment variable selecting the deployment mode.
pub const MODE_ENV_VAR: &str = "ENV";

const DEFAULT_STORE_PATH: &str = "dev_data/notebooks.db";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Server configuration
///
/// The config is usually loaded from a file with [`Self::load`]. Missing
/// sections fall back to [`Config::default`], which suits local development.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Config for the HTTP listener
    pub http: HttpConfig,
    /// Location of the server-side notebook store
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub sync: SyncConfig,
    /// Reported by `/health`; defaults from the `ENV` variable.
    pub mode: Mode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file; parent directories are created on startup.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rotating log files; stderr when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Numbered rename candidates tried before random suffixes.
    pub max_rename_attempts: u32,
    /// Largest accepted request body, base64 envelope included.
    pub max_upload_bytes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_rename_attempts: DEFAULT_MAX_RENAME_ATTEMPTS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Deployment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    /// Reads the mode from the `ENV` variable.
    pub fn from_env() -> Self {
        Self::from_env_value(env::var(MODE_ENV_VAR).ok().as_deref())
    }

    /// Unset or `development` means development; anything else is production.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            None | Some("development") => Self::Development,
            Some(_) => Self::Production,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Config {
    /// Load the config from a file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Config> {
        let s = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("failed to read {}", path.as_ref().to_string_lossy()))?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Config> {
        let config: Config = toml::from_str(s).context("invalid server config")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                port: 8080,
                bind_addr: None,
            },
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
            sync: SyncConfig::default(),
            mode: Mode::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, Mode};
    use nbsync_core::default_log_level;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            mode = "production"

            [http]
            port = 9000
            bind_addr = "127.0.0.1"

            [sync]
            max_rename_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.http.port, 9000);
        assert_eq!(
            config.http.bind_addr,
            Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
        );
        assert_eq!(config.sync.max_rename_attempts, 5);
        assert_eq!(config.sync.max_upload_bytes, 64 * 1024 * 1024);
        assert_eq!(config.store.path.to_str(), Some("dev_data/notebooks.db"));
        assert_eq!(config.mode, Mode::Production);
    }

    #[test]
    fn partial_logging_and_store_sections_keep_defaults() {
        let config = Config::from_toml(
            r#"
            [logging]
            dir = "/var/log/nbsync"

            [store]
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, default_log_level());
        assert_eq!(
            config.logging.dir.as_deref().and_then(|dir| dir.to_str()),
            Some("/var/log/nbsync")
        );
        assert_eq!(config.store.path.to_str(), Some("dev_data/notebooks.db"));
    }

    #[test]
    fn mode_follows_env_value() {
        assert_eq!(Mode::from_env_value(None), Mode::Development);
        assert_eq!(Mode::from_env_value(Some("development")), Mode::Development);
        assert_eq!(Mode::from_env_value(Some("prod")), Mode::Production);
        assert_eq!(Mode::Production.to_string(), "production");
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Config::from_toml("mode = \"staging\"").is_err());
    }
}

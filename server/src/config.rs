//! Layered server configuration.
//!
//! Precedence (later layers override earlier):
//! 1. Built-in defaults
//! 2. TOML file (`--config`, `$TASKBOARD_CONFIG`, or
//!    `<config dir>/taskboard/config.toml`)
//! 3. `TASKBOARD_*` environment variables
//!
//! Command-line flags are applied by the binary on top of the result.
//!
//! ```toml
//! bind = "127.0.0.1:4000"
//! database = "/var/lib/taskboard/taskboard.db"
//! jwt_secret = "change-me"
//! jwt_expires_in = "7d"
//! allowed_origins = ["http://localhost:5173"]
//! log = "info"
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::auth::token::parse_lifetime;

pub const DEFAULT_BIND: &str = "0.0.0.0:4000";
pub const DEFAULT_JWT_SECRET: &str = "my-secret";
pub const DEFAULT_JWT_EXPIRES_IN: &str = "7d";
pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_LOG: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("I/O error loading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for ${var}: '{value}' (expected: {expected})")]
    InvalidEnvValue {
        var: String,
        value: String,
        expected: String,
    },

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Fully resolved server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: String,
    pub database: PathBuf,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub allowed_origins: Vec<String>,
    pub log: String,
}

impl ServerConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let defaults = ConfigLoader::default_config();
        Self {
            bind: DEFAULT_BIND.to_string(),
            database: defaults.database.unwrap_or_else(|| PathBuf::from("taskboard.db")),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expires_in: Duration::from_secs(7 * 86_400),
            allowed_origins: vec![DEFAULT_ORIGIN.to_string()],
            log: DEFAULT_LOG.to_string(),
        }
    }
}

/// One configuration layer. `None` means "not set at this layer".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayeredConfig {
    pub bind: Option<String>,
    pub database: Option<PathBuf>,
    pub jwt_secret: Option<String>,
    pub jwt_expires_in: Option<String>,
    pub allowed_origins: Option<Vec<String>>,
    pub log: Option<String>,
}

pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
    skip_file: bool,
    skip_env: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: "TASKBOARD".to_string(),
            skip_file: false,
            skip_env: false,
        }
    }

    /// Read the file layer from `path` instead of the default location.
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn skip_file_layer(mut self) -> Self {
        self.skip_file = true;
        self
    }

    pub fn skip_env_layer(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn load(self) -> Result<ServerConfig, ConfigLoadError> {
        let mut config = Self::default_config();

        if !self.skip_file
            && let Some(path) = self.resolve_config_path()
        {
            let file_config = Self::load_from_file(&path)?;
            Self::merge_config(&mut config, file_config);
        }

        if !self.skip_env {
            Self::apply_env_overrides(&mut config, &self.env_prefix)?;
        }

        Self::finish(config)
    }

    fn resolve_config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }
        if let Ok(path) = env::var(format!("{}_CONFIG", self.env_prefix))
            && !path.trim().is_empty()
        {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("taskboard").join("config.toml"))
    }

    pub fn default_config() -> LayeredConfig {
        LayeredConfig {
            bind: Some(DEFAULT_BIND.to_string()),
            database: Some(
                dirs::data_dir()
                    .map(|dir| dir.join("taskboard").join("taskboard.db"))
                    .unwrap_or_else(|| PathBuf::from("taskboard.db")),
            ),
            jwt_secret: Some(DEFAULT_JWT_SECRET.to_string()),
            jwt_expires_in: Some(DEFAULT_JWT_EXPIRES_IN.to_string()),
            allowed_origins: Some(vec![DEFAULT_ORIGIN.to_string()]),
            log: Some(DEFAULT_LOG.to_string()),
        }
    }

    /// A missing file yields an empty layer, not an error.
    pub fn load_from_file(path: &Path) -> Result<LayeredConfig, ConfigLoadError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                return Ok(LayeredConfig::default());
            }
            Err(source) => {
                return Err(ConfigLoadError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        tracing::info!("Loading config from {}", path.display());
        Ok(toml::from_str(&contents)?)
    }

    pub fn merge_config(base: &mut LayeredConfig, overlay: LayeredConfig) {
        if overlay.bind.is_some() {
            base.bind = overlay.bind;
        }
        if overlay.database.is_some() {
            base.database = overlay.database;
        }
        if overlay.jwt_secret.is_some() {
            base.jwt_secret = overlay.jwt_secret;
        }
        if overlay.jwt_expires_in.is_some() {
            base.jwt_expires_in = overlay.jwt_expires_in;
        }
        if overlay.allowed_origins.is_some() {
            base.allowed_origins = overlay.allowed_origins;
        }
        if overlay.log.is_some() {
            base.log = overlay.log;
        }
    }

    /// Blank variables are ignored. `{prefix}_ORIGINS` is comma-separated.
    pub fn apply_env_overrides(
        config: &mut LayeredConfig,
        prefix: &str,
    ) -> Result<(), ConfigLoadError> {
        let read = |name: &str| -> Option<(String, String)> {
            let var = format!("{prefix}_{name}");
            let value = env::var(&var).ok()?;
            if value.trim().is_empty() {
                return None;
            }
            tracing::debug!("Applying env override: {var}");
            Some((var, value.trim().to_string()))
        };

        if let Some((_, value)) = read("BIND") {
            config.bind = Some(value);
        }
        if let Some((_, value)) = read("DATABASE") {
            config.database = Some(PathBuf::from(value));
        }
        if let Some((_, value)) = read("JWT_SECRET") {
            config.jwt_secret = Some(value);
        }
        if let Some((var, value)) = read("JWT_EXPIRES_IN") {
            if parse_lifetime(&value).is_none() {
                return Err(ConfigLoadError::InvalidEnvValue {
                    var,
                    value,
                    expected: "seconds, or a number with an s/m/h/d suffix".to_string(),
                });
            }
            config.jwt_expires_in = Some(value);
        }
        if let Some((_, value)) = read("ORIGINS") {
            let origins = value
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
            config.allowed_origins = Some(origins);
        }
        if let Some((_, value)) = read("LOG") {
            config.log = Some(value);
        }
        Ok(())
    }

    fn finish(layered: LayeredConfig) -> Result<ServerConfig, ConfigLoadError> {
        let defaults = ServerConfig::default();
        let jwt_expires_in = match layered.jwt_expires_in {
            Some(raw) => parse_lifetime(&raw).ok_or_else(|| {
                ConfigLoadError::Validation(format!("jwt_expires_in: cannot parse '{raw}'"))
            })?,
            None => defaults.jwt_expires_in,
        };
        let jwt_secret = layered.jwt_secret.unwrap_or(defaults.jwt_secret);
        if jwt_secret.is_empty() {
            return Err(ConfigLoadError::Validation(
                "jwt_secret must not be empty".to_string(),
            ));
        }
        Ok(ServerConfig {
            bind: layered.bind.unwrap_or(defaults.bind),
            database: layered.database.unwrap_or(defaults.database),
            jwt_secret,
            jwt_expires_in,
            allowed_origins: layered.allowed_origins.unwrap_or(defaults.allowed_origins),
            log: layered.log.unwrap_or(defaults.log),
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

//! Configuration for the plugin host.
//!
//! Configuration is read from a YAML file and can be overridden with
//! environment variables of the form `DNP3__SECTION__KEY`, for example
//! `DNP3__SERVER__BIND_ADDR=127.0.0.1:9000`.
//!
//! # Examples
//!
//! ```
//! use dnp3_core::config::AppConfig;
//!
//! let config = AppConfig::from_yaml("server:\n  bind_addr: 127.0.0.1:8888\n").unwrap();
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{ConfigError, Result};
use crate::types::Access;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerSection,

    /// Credentials accepted by the authorization layer
    #[serde(default)]
    pub auth: AuthSection,

    /// Ability catalog and payload locations
    #[serde(default)]
    pub data: DataSection,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration from `path` layered with `DNP3__*` environment
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or merged.
    pub fn from_config_builder<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("DNP3")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        self.server.bind_addr()?;
        self.auth.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Listener address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8888".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl ServerSection {
    /// Parsed listener address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind_addr.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::invalid_value("server.bind_addr", e.to_string()).into()
        })
    }

    /// Replaces the configured address, e.g. with a command line override.
    pub fn set_bind_addr(&mut self, addr: SocketAddr) {
        self.bind_addr = addr.to_string();
    }
}

// ============================================================================
// Authorization
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    /// Secret used to sign session tokens
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Session token lifetime in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,

    /// API key granting red access
    #[serde(default)]
    pub api_key_red: Option<String>,

    /// API key granting blue access
    #[serde(default)]
    pub api_key_blue: Option<String>,

    /// Operator accounts
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

fn default_jwt_secret() -> String {
    "change-me-in-production".to_string()
}

/// Longest accepted session token lifetime (ten years).
pub const MAX_JWT_EXPIRATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn default_jwt_expiration() -> u64 {
    8 * 60 * 60
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_expiration_secs: default_jwt_expiration(),
            api_key_red: None,
            api_key_blue: None,
            users: Vec::new(),
        }
    }
}

impl AuthSection {
    fn validate(&self) -> Result<()> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::missing_field("auth.jwt_secret").into());
        }
        if self.jwt_expiration_secs == 0 {
            return Err(
                ConfigError::invalid_value("auth.jwt_expiration_secs", "must be positive").into(),
            );
        }
        if self.jwt_expiration_secs > MAX_JWT_EXPIRATION_SECS {
            return Err(ConfigError::invalid_value(
                "auth.jwt_expiration_secs",
                format!("must not exceed {} seconds", MAX_JWT_EXPIRATION_SECS),
            )
            .into());
        }
        for (field, key) in [
            ("auth.api_key_red", &self.api_key_red),
            ("auth.api_key_blue", &self.api_key_blue),
        ] {
            if matches!(key, Some(k) if k.trim().is_empty()) {
                return Err(ConfigError::invalid_value(field, "must not be empty").into());
            }
        }

        let mut seen = HashSet::new();
        for user in &self.users {
            if !seen.insert(user.username.as_str()) {
                return Err(ConfigError::invalid_value(
                    "auth.users",
                    format!("duplicate username {}", user.username),
                )
                .into());
            }
            if user.password.len() < 8 {
                return Err(ConfigError::invalid_value(
                    "auth.users",
                    format!("password for {} is shorter than 8 characters", user.username),
                )
                .into());
            }
            if !matches!(user.group, Access::Red | Access::Blue) {
                return Err(ConfigError::invalid_value(
                    "auth.users",
                    format!("{} must belong to the red or blue group", user.username),
                )
                .into());
            }
        }
        Ok(())
    }
}

/// Operator account definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    pub password: String,
    pub group: Access,
}

// ============================================================================
// Data
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSection {
    /// Root scanned for ability documents
    #[serde(default = "default_abilities_dir")]
    pub abilities_dir: PathBuf,

    /// Directory holding plugin folders
    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: PathBuf,

    /// Shared payload directories
    #[serde(default)]
    pub payload_dirs: Vec<PathBuf>,
}

fn default_abilities_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_plugins_dir() -> PathBuf {
    PathBuf::from("plugins")
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            abilities_dir: default_abilities_dir(),
            plugins_dir: default_plugins_dir(),
            payload_dirs: Vec::new(),
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `dnp3_api=debug`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<()> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::missing_field("logging.level").into());
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

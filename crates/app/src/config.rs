//! Service configuration loaded from `config.toml`.
//!
//! The file is read once at startup; there is no hot reload. Secrets and the
//! listen port can be overridden from the command line or the environment.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use store::StoreConfig;

pub const APP_NAME: &str = "bucketgate";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub options: Options,
}

/// Application identity, reported by the version endpoint and in logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_version")]
    pub version: String,
}

fn default_app_name() -> String {
    APP_NAME.to_string()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

/// Object store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(flatten)]
    pub backend: StoreConfig,
    /// Bucket probed at startup and by the readiness check
    #[serde(default = "default_bucket")]
    pub default_bucket: String,
}

fn default_bucket() -> String {
    APP_NAME.to_string()
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreConfig::Memory,
            default_bucket: default_bucket(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Port for the HTTP server
    #[serde(default = "default_port")]
    pub port: u16,
    /// Timeout applied to every request made to the object store
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Default log level; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for log files (logs to stdout only if not set)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Directory of a pre-built frontend to serve at `/`
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Options {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
            log_dir: None,
            static_dir: None,
        }
    }
}

impl Config {
    /// Default config path (~/.bucketgate/config.toml).
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)).join(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config to `path`, refusing to overwrite an existing file.
    pub fn init(&self, path: &Path) -> Result<(), ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.default_bucket.is_empty() {
            return Err(ConfigError::Invalid("store.default_bucket is empty".into()));
        }
        if let StoreConfig::S3 { endpoint, .. } = &self.store.backend {
            if endpoint.is_empty() {
                return Err(ConfigError::Invalid("store.endpoint is empty".into()));
            }
        }
        self.log_level()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.options.port)
    }

    pub fn store_timeout(&self) -> Option<Duration> {
        match self.options.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn log_level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(&self.options.log_level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level: {}", self.options.log_level)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}. Run 'bucketgate init' first")]
    NotFound(PathBuf),

    #[error("config file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

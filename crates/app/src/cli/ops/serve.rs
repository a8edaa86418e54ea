use std::path::PathBuf;

use clap::Args;

use bucketgate::config::{Config, ConfigError};
use bucketgate::spawn_service;
use store::StoreConfig;

#[derive(Args, Debug, Clone)]
pub struct Serve {
    /// Override the HTTP listen port
    #[arg(long, env = "BUCKETGATE_PORT")]
    pub port: Option<u16>,

    /// Override the S3 access key
    #[arg(long, env = "BUCKETGATE_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Override the S3 secret key
    #[arg(long, env = "BUCKETGATE_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Override the S3 session token
    #[arg(long, env = "BUCKETGATE_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long, env = "BUCKETGATE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("credential overrides require the s3 store backend")]
    NotS3,
}

impl Serve {
    /// Apply command line and environment overrides on top of the config file.
    fn apply(&self, config: &mut Config) -> Result<(), ServeError> {
        if let Some(port) = self.port {
            config.options.port = port;
        }
        if let Some(log_dir) = &self.log_dir {
            config.options.log_dir = Some(log_dir.clone());
        }

        let wants_credentials =
            self.access_key.is_some() || self.secret_key.is_some() || self.session_token.is_some();
        match &mut config.store.backend {
            StoreConfig::S3 {
                access_key,
                secret_key,
                session_token,
                ..
            } => {
                if let Some(key) = &self.access_key {
                    *access_key = key.clone();
                }
                if let Some(secret) = &self.secret_key {
                    *secret_key = secret.clone();
                }
                if let Some(token) = &self.session_token {
                    *session_token = Some(token.clone());
                }
            }
            _ if wants_credentials => return Err(ServeError::NotS3),
            _ => {}
        }

        config.validate()?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Serve {
    type Error = ServeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = Config::load(&ctx.config_path()?)?;
        self.apply(&mut config)?;

        spawn_service(&config).await;
        Ok("service stopped".to_string())
    }
}

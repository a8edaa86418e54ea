use std::path::PathBuf;

use clap::Args;

use bucketgate::config::{Config, ConfigError};
use store::StoreConfig;

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// HTTP listen port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Bucket probed at startup and by the readiness check
    #[arg(long, default_value = "bucketgate")]
    pub default_bucket: String,

    /// S3-compatible endpoint (e.g. http://localhost:9000). Selects the S3 backend
    #[arg(long, conflicts_with = "local_root")]
    pub endpoint: Option<String>,

    /// Access key for the S3 backend
    #[arg(long, default_value = "")]
    pub access_key: String,

    /// Secret key for the S3 backend
    #[arg(long, default_value = "")]
    pub secret_key: String,

    /// Region for the S3 backend
    #[arg(long)]
    pub region: Option<String>,

    /// Keep buckets as directories under this path instead of using S3
    #[arg(long)]
    pub local_root: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    Config(#[from] ConfigError),
}

impl Init {
    fn store_config(&self) -> StoreConfig {
        match (&self.endpoint, &self.local_root) {
            (Some(endpoint), _) => StoreConfig::S3 {
                endpoint: endpoint.clone(),
                access_key: self.access_key.clone(),
                secret_key: self.secret_key.clone(),
                session_token: None,
                region: self.region.clone(),
            },
            (None, Some(root)) => StoreConfig::Local { root: root.clone() },
            (None, None) => StoreConfig::Memory,
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let path = ctx.config_path()?;

        let mut config = Config::default();
        config.options.port = self.port;
        config.store.default_bucket = self.default_bucket.clone();
        config.store.backend = self.store_config();
        config.validate()?;
        config.init(&path)?;

        let backend = match &config.store.backend {
            StoreConfig::Memory => "memory".to_string(),
            StoreConfig::Local { root } => format!("local ({})", root.display()),
            StoreConfig::S3 { endpoint, .. } => format!("s3 ({})", endpoint),
        };

        Ok(format!(
            "Wrote config to: {}\n\
             - Store: {}\n\
             - Default bucket: {}\n\
             - Port: {}",
            path.display(),
            backend,
            config.store.default_bucket,
            config.options.port
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::cli::op::{Op, OpContext};

    fn init(args: &[&str]) -> Init {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            init: Init,
        }

        let argv = std::iter::once("init").chain(args.iter().copied());
        Wrapper::parse_from(argv).init
    }

    #[tokio::test]
    async fn test_writes_s3_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let ctx = OpContext::new(Some(path.clone()));

        let op = init(&[
            "--endpoint",
            "http://localhost:9000",
            "--access-key",
            "minio",
            "--secret-key",
            "minio123",
            "--default-bucket",
            "uploads",
        ]);
        let output = op.execute(&ctx).await.unwrap();
        assert!(output.contains("s3 (http://localhost:9000)"));

        let config = Config::load(&path).unwrap();
        assert_eq!(config.store.default_bucket, "uploads");
        assert!(matches!(config.store.backend, StoreConfig::S3 { .. }));

        assert!(matches!(
            op.execute(&ctx).await,
            Err(InitError::Config(ConfigError::AlreadyExists(_)))
        ));
    }

    #[test]
    fn test_defaults_to_memory() {
        assert!(matches!(init(&[]).store_config(), StoreConfig::Memory));
    }
}

use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // Listen address
    pub listen_addr: SocketAddr,
    // log level for http tracing
    pub log_level: tracing::Level,
    // Pre-built frontend served for any path the API does not claim
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            log_level: tracing::Level::INFO,
            static_dir: None,
        }
    }
}

impl From<&crate::config::Config> for Config {
    fn from(config: &crate::config::Config) -> Self {
        tracing::info!(
            "Creating HTTP server Config: listen_addr={}, static_dir={:?}",
            config.listen_addr(),
            config.options.static_dir
        );
        Self {
            listen_addr: config.listen_addr(),
            log_level: config.log_level().unwrap_or(tracing::Level::INFO),
            static_dir: config.options.static_dir.clone(),
        }
    }
}

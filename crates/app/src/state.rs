use std::sync::Arc;

use store::{Storage, StoreError};

use crate::config::Config;

/// Main service state, shared by every request handler
#[derive(Clone, Debug)]
pub struct State {
    storage: Storage,
    config: Arc<Config>,
}

impl State {
    /// Connect to the object store and verify the default bucket is reachable.
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        tracing::debug!(
            bucket = %config.store.default_bucket,
            "State::from_config - connecting to object store"
        );
        let storage = Storage::connect(
            config.store.backend.clone(),
            config.store_timeout(),
            &config.store.default_bucket,
        )
        .await?;

        Ok(Self::new(storage, config.clone()))
    }

    /// Wrap an already constructed store client.
    pub fn new(storage: Storage, config: Config) -> Self {
        Self {
            storage,
            config: Arc::new(config),
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("failed to connect to the object store: {0}")]
    Store(#[from] StoreError),
}

use std::sync::Arc;

use meilisearch_sdk::client::Client;
use redis::aio::ConnectionManager;

use crate::{
    config::Config,
    database::init_redis,
    error::Result,
    search::init_meilisearch,
};

/// Owned handles to the external collaborators, built once and cloned into
/// each service. Nothing here is lazily initialized.
pub struct State {
    pub config: Config,
    pub redis: ConnectionManager,
    pub meili: Arc<Client>,
}

impl State {
    pub async fn new() -> Result<Arc<Self>> {
        Self::with_config(Config::load()).await
    }

    pub async fn with_config(config: Config) -> Result<Arc<Self>> {
        let redis = init_redis(&config.redis_url).await?;
        let meili = init_meilisearch(&config.meili_url, &config.meili_key).await?;

        Ok(Arc::new(Self {
            config,
            redis,
            meili,
        }))
    }
}

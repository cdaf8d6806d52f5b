use std::sync::Arc;

use crate::config::AppConfig;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::dataverse::{
    DataverseApi, DataverseClient, DataverseRepository, InMemoryDataverse, Table,
};
use crate::infrastructure::mailer::{LogMailer, Mailer, WebhookMailer};

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn DataverseApi>,
    pub cache: Cache,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        api: Arc<dyn DataverseApi>,
        cache: Cache,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            api,
            cache,
            mailer,
            config: Arc::new(config),
        }
    }

    /// Wires the platform client, cache and mailer described by `config`
    pub fn from_config(config: AppConfig) -> Self {
        let api: Arc<dyn DataverseApi> = match &config.dataverse_url {
            Some(url) => Arc::new(DataverseClient::new(
                url.clone(),
                config.dataverse_credentials.clone(),
            )),
            None => Arc::new(InMemoryDataverse::new()),
        };
        let mailer: Arc<dyn Mailer> = match &config.mail_webhook_url {
            Some(url) => Arc::new(WebhookMailer::new(url.clone())),
            None => Arc::new(LogMailer),
        };
        let cache = Cache::in_memory(config.cache_ttl);

        Self::new(config, api, cache, mailer)
    }

    /// Repository for one record type over the shared client and cache
    pub fn repo<R: Table>(&self) -> DataverseRepository<R> {
        DataverseRepository::new(self.api.clone(), self.cache.clone())
    }
}

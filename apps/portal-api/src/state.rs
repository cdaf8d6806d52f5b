use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::infrastructure::repositories::{PostgresAccountRepository, PostgresOrganizationRepository};

/// Shared handler state: the connection pool and configuration
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }

    pub fn accounts(&self) -> PostgresAccountRepository {
        PostgresAccountRepository::new(self.pool.clone())
    }

    pub fn organizations(&self) -> PostgresOrganizationRepository {
        PostgresOrganizationRepository::new(self.pool.clone())
    }
}

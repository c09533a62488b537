/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    db,
    error::ModResult,
    moderation::ModerationService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub moderation: Arc<ModerationService>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ModResult<Self> {
        config.validate()?;

        let options = db::DatabaseOptions {
            max_connections: config.storage.max_connections,
            ..Default::default()
        };
        let pool = db::create_pool(&config.storage.database, options).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        tracing::info!("Database ready at {}", config.storage.database.display());

        Ok(Self::with_pool(config, pool))
    }

    /// Build a context around an already migrated pool
    pub fn with_pool(config: ServerConfig, pool: SqlitePool) -> Self {
        let moderation = ModerationService::new(pool.clone(), config.moderation.policy());

        Self {
            config: Arc::new(config),
            db: pool,
            moderation: Arc::new(moderation),
        }
    }

    pub fn with_moderation(mut self, moderation: ModerationService) -> Self {
        self.moderation = Arc::new(moderation);
        self
    }
}

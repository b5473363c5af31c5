use crate::auth::{
    memory::MemoryRepo,
    repo::{CredentialRepo, PgRepo},
    services::AuthService,
};
use crate::config::AppConfig;
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let repo: Arc<dyn CredentialRepo> = match &config.storage.database_url {
            Some(url) => {
                let db = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(config.storage.max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;

                Arc::new(PgRepo::new(db))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
                Arc::new(MemoryRepo::new())
            }
        };

        Ok(Self::from_parts(&config, repo))
    }

    pub fn from_parts(config: &AppConfig, repo: Arc<dyn CredentialRepo>) -> Self {
        let auth = AuthService::new(repo, config.storage.timeout());
        Self { auth }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::StorageConfig;

        let config = AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            storage: StorageConfig {
                database_url: None,
                max_connections: 1,
                timeout_ms: 5_000,
            },
        };
        Self::from_parts(&config, Arc::new(MemoryRepo::new()))
    }
}

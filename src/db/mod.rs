use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::info;

use crate::config::DatabaseConfig;

pub mod credentials;
mod error;
pub mod migrator;
pub mod repositories;

pub use credentials::{CredentialConnection, CredentialStore};
pub use error::StoreError;
pub use repositories::gm::GmCredential;
pub use repositories::user::UserCredential;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        let config = DatabaseConfig {
            url: db_url.to_string(),
            ..DatabaseConfig::default()
        };
        Self::connect(&config).await
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        ensure_sqlite_file(&config.url).await?;

        let mut opt = ConnectOptions::new(config.url.clone());
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            config.min_connections, config.max_connections
        );

        Ok(Self { conn })
    }

    /// Session store sharing this pool. Creates its table on first use.
    pub async fn session_store(&self) -> Result<SqliteStore> {
        let store = SqliteStore::new(self.conn.get_sqlite_connection_pool().clone());
        store.migrate().await?;
        Ok(store)
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }
}

/// sqlite refuses to open a missing file, so create it (and its directory)
/// up front. In-memory URLs are left alone.
async fn ensure_sqlite_file(db_url: &str) -> Result<()> {
    let Some(path_str) = db_url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    let path_str = path_str.trim_start_matches("//");
    let path_str = path_str.split('?').next().unwrap_or(path_str);

    if path_str.is_empty() || path_str.starts_with(":memory:") {
        return Ok(());
    }

    let path = Path::new(path_str);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    if !path.exists() {
        tokio::fs::File::create(path).await?;
    }

    Ok(())
}

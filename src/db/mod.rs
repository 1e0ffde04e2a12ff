pub mod dialect;
mod error;
#[cfg(feature = "database-mysql")]
pub mod mysql;
#[cfg(feature = "database-postgres")]
pub mod postgres;
pub mod queries;
pub mod repos;
#[cfg(feature = "database-sqlite")]
pub mod sqlite;

#[cfg(all(
    test,
    any(
        feature = "database-sqlite",
        feature = "database-postgres",
        feature = "database-mysql"
    )
))]
pub mod tests;

use std::sync::Arc;

pub use dialect::SqlDialect;
pub use error::{DbError, DbResult};
pub use repos::*;

use crate::config::DatabaseConfig;

/// PostgreSQL pool configuration with optional read replica.
#[cfg(feature = "database-postgres")]
pub struct PgPoolPair {
    /// Primary pool.
    pub write: sqlx::PgPool,
    /// Optional read replica pool. If None, reads use the primary.
    pub read: Option<sqlx::PgPool>,
}

#[cfg(feature = "database-postgres")]
impl PgPoolPair {
    /// Get the pool to use for read operations.
    pub fn read_pool(&self) -> &sqlx::PgPool {
        self.read.as_ref().unwrap_or(&self.write)
    }

    /// Get the pool to use for write operations.
    pub fn write_pool(&self) -> &sqlx::PgPool {
        &self.write
    }
}

/// Cached repository trait objects, created once at startup.
struct CachedRepos {
    billing_tags: Arc<dyn BillingTagRepo>,
}

enum PoolStorage {
    #[cfg(feature = "database-sqlite")]
    Sqlite(sqlx::SqlitePool),
    #[cfg(feature = "database-postgres")]
    Postgres(PgPoolPair),
    #[cfg(feature = "database-mysql")]
    Mysql(sqlx::MySqlPool),
    #[cfg(not(any(
        feature = "database-sqlite",
        feature = "database-postgres",
        feature = "database-mysql"
    )))]
    _None(std::convert::Infallible),
}

/// Borrowed reference to the underlying database pool.
/// Used by tests and tooling that need direct pool access.
pub enum DbPoolRef<'a> {
    #[cfg(feature = "database-sqlite")]
    Sqlite(&'a sqlx::SqlitePool),
    #[cfg(feature = "database-postgres")]
    Postgres(&'a PgPoolPair),
    #[cfg(feature = "database-mysql")]
    Mysql(&'a sqlx::MySqlPool),
    #[cfg(not(any(
        feature = "database-sqlite",
        feature = "database-postgres",
        feature = "database-mysql"
    )))]
    _None(std::convert::Infallible, std::marker::PhantomData<&'a ()>),
}

/// Database pool over SQLite, PostgreSQL or MySQL.
///
/// Repositories are cached at construction time to avoid allocation on each access.
pub struct DbPool {
    inner: PoolStorage,
    repos: CachedRepos,
}

impl DbPool {
    /// Create a DbPool from an existing SQLite pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-sqlite")]
    pub fn from_sqlite(pool: sqlx::SqlitePool) -> Self {
        let repos = CachedRepos {
            billing_tags: Arc::new(sqlite::SqliteBillingTagRepo::new(pool.clone())),
        };
        DbPool {
            inner: PoolStorage::Sqlite(pool),
            repos,
        }
    }

    /// Create a DbPool from existing PostgreSQL pools.
    /// Primarily useful for testing.
    #[cfg(feature = "database-postgres")]
    pub fn from_postgres(write_pool: sqlx::PgPool, read_pool: Option<sqlx::PgPool>) -> Self {
        let pools = PgPoolPair {
            write: write_pool,
            read: read_pool,
        };
        let repos = CachedRepos {
            billing_tags: Arc::new(postgres::PostgresBillingTagRepo::new(
                pools.read_pool().clone(),
            )),
        };
        DbPool {
            inner: PoolStorage::Postgres(pools),
            repos,
        }
    }

    /// Create a DbPool from an existing MySQL pool.
    /// Primarily useful for testing.
    #[cfg(feature = "database-mysql")]
    pub fn from_mysql(pool: sqlx::MySqlPool) -> Self {
        let repos = CachedRepos {
            billing_tags: Arc::new(mysql::MysqlBillingTagRepo::new(pool.clone())),
        };
        DbPool {
            inner: PoolStorage::Mysql(pool),
            repos,
        }
    }

    /// Create a database pool from configuration
    pub async fn from_config(config: &DatabaseConfig) -> DbResult<Self> {
        match config {
            DatabaseConfig::None => Err(DbError::NotConfigured),
            #[cfg(feature = "database-sqlite")]
            DatabaseConfig::Sqlite(cfg) => {
                use std::str::FromStr;

                use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

                // Every connection to `:memory:` opens its own database, so the pool
                // is pinned to a single connection.
                let (options, max_connections) = if cfg.path == ":memory:" {
                    (SqliteConnectOptions::from_str("sqlite::memory:")?, 1)
                } else {
                    (
                        SqliteConnectOptions::new()
                            .filename(&cfg.path)
                            .create_if_missing(cfg.create_if_missing)
                            .journal_mode(if cfg.wal_mode {
                                SqliteJournalMode::Wal
                            } else {
                                SqliteJournalMode::Delete
                            }),
                        cfg.max_connections,
                    )
                };

                let pool = SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .connect_with(
                        options.busy_timeout(std::time::Duration::from_millis(cfg.busy_timeout_ms)),
                    )
                    .await?;

                tracing::debug!(path = %cfg.path, "Connected to SQLite");
                Ok(Self::from_sqlite(pool))
            }
            #[cfg(feature = "database-postgres")]
            DatabaseConfig::Postgres(cfg) => {
                let write_pool = sqlx::postgres::PgPoolOptions::new()
                    .min_connections(cfg.min_connections)
                    .max_connections(cfg.max_connections)
                    .connect(&cfg.url)
                    .await?;

                let read_pool = if let Some(read_url) = &cfg.read_url {
                    tracing::info!("Configuring read replica pool");
                    Some(
                        sqlx::postgres::PgPoolOptions::new()
                            .min_connections(cfg.min_connections)
                            .max_connections(cfg.max_connections)
                            .connect(read_url)
                            .await?,
                    )
                } else {
                    None
                };

                Ok(Self::from_postgres(write_pool, read_pool))
            }
            #[cfg(feature = "database-mysql")]
            DatabaseConfig::Mysql(cfg) => {
                let pool = sqlx::mysql::MySqlPoolOptions::new()
                    .min_connections(cfg.min_connections)
                    .max_connections(cfg.max_connections)
                    .connect(&cfg.url)
                    .await?;

                Ok(Self::from_mysql(pool))
            }
        }
    }

    /// SQL dialect of the connected backend.
    pub fn dialect(&self) -> SqlDialect {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(_) => SqlDialect::Sqlite,
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(_) => SqlDialect::Postgres,
            #[cfg(feature = "database-mysql")]
            PoolStorage::Mysql(_) => SqlDialect::Mysql,
            #[cfg(not(any(
                feature = "database-sqlite",
                feature = "database-postgres",
                feature = "database-mysql"
            )))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Apply the bundled schema using sqlx's migration runner.
    ///
    /// The `logs`, `tokens` and `users` tables are normally owned by the service
    /// that writes them; this exists for development databases and tests.
    /// Migrations always run on the primary pool.
    pub async fn run_migrations(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                tracing::info!("Running SQLite migrations");
                sqlx::migrate!("./migrations_sqlx/sqlite").run(pool).await?;
                tracing::info!("SQLite migrations completed successfully");
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => {
                tracing::info!("Running PostgreSQL migrations");
                sqlx::migrate!("./migrations_sqlx/postgres")
                    .run(pools.write_pool())
                    .await?;
                tracing::info!("PostgreSQL migrations completed successfully");
                Ok(())
            }
            #[cfg(feature = "database-mysql")]
            PoolStorage::Mysql(pool) => {
                tracing::info!("Running MySQL migrations");
                sqlx::migrate!("./migrations_sqlx/mysql").run(pool).await?;
                tracing::info!("MySQL migrations completed successfully");
                Ok(())
            }
            #[cfg(not(any(
                feature = "database-sqlite",
                feature = "database-postgres",
                feature = "database-mysql"
            )))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Get billing tag report repository
    pub fn billing_tags(&self) -> Arc<dyn BillingTagRepo> {
        Arc::clone(&self.repos.billing_tags)
    }

    /// Get a reference to the underlying database pool.
    pub fn pool(&self) -> DbPoolRef<'_> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => DbPoolRef::Sqlite(pool),
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => DbPoolRef::Postgres(pools),
            #[cfg(feature = "database-mysql")]
            PoolStorage::Mysql(pool) => DbPoolRef::Mysql(pool),
            #[cfg(not(any(
                feature = "database-sqlite",
                feature = "database-postgres",
                feature = "database-mysql"
            )))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }

    /// Health check for database connectivity
    pub async fn health_check(&self) -> DbResult<()> {
        match &self.inner {
            #[cfg(feature = "database-sqlite")]
            PoolStorage::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(feature = "database-postgres")]
            PoolStorage::Postgres(pools) => {
                sqlx::query("SELECT 1").execute(&pools.write).await?;
                if let Some(read) = &pools.read {
                    sqlx::query("SELECT 1").execute(read).await?;
                }
                Ok(())
            }
            #[cfg(feature = "database-mysql")]
            PoolStorage::Mysql(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
            #[cfg(not(any(
                feature = "database-sqlite",
                feature = "database-postgres",
                feature = "database-mysql"
            )))]
            PoolStorage::_None(infallible) => match *infallible {},
        }
    }
}

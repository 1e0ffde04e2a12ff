use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database not configured")]
    NotConfigured,

    #[cfg(any(
        feature = "database-sqlite",
        feature = "database-postgres",
        feature = "database-mysql"
    ))]
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[cfg(any(
        feature = "database-sqlite",
        feature = "database-postgres",
        feature = "database-mysql"
    ))]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type DbResult<T> = Result<T, DbError>;

//! Connection pool and schema migrations

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use folio_core::DatabaseConfig;

/// Embedded migrations from `migrations/` at the workspace root
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Create a PostgreSQL connection pool sized from configuration.
///
/// # Errors
///
/// Returns an error if the connection fails.
///
/// # Example
///
/// ```ignore
/// let pool = connect(&FolioConfig::load()?.database).await?;
/// ```
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

/// Apply pending migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await?;
    info!(
        migrations = MIGRATOR.iter().count(),
        "database schema up to date"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Run with: DATABASE_URL=postgres://... cargo test -p folio-db -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_acquires_connection() {
        let config = DatabaseConfig {
            url: std::env::var("DATABASE_URL").expect("DATABASE_URL required"),
            max_connections: 1,
        };
        let pool = connect(&config).await.expect("pool creation failed");

        let result: (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query failed");

        assert_eq!(result.0, 1);
    }

    #[sqlx::test(migrator = "crate::pool::MIGRATOR")]
    #[ignore = "requires database"]
    async fn migrations_create_increment_stat(pool: PgPool) {
        let value: (i64,) = sqlx::query_as("SELECT increment_stat('total_connections', 2)")
            .fetch_one(&pool)
            .await
            .expect("increment_stat missing");
        assert_eq!(value.0, 2);
    }
}

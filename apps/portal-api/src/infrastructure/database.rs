//! Postgres connection pool and embedded migrations.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connect to Postgres with at most `max_connections` pooled connections
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    tracing::info!(max_connections, "Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    tracing::info!("Database connected successfully");
    Ok(pool)
}

/// Apply the SQL files under `migrations/`
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await
}

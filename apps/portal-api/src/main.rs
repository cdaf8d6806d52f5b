use anyhow::Context;

use portal_api::api::routes::build_router;
use portal_api::config::Config;
use portal_api::infrastructure::database;
use portal_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    init_tracing();

    let config = Config::from_env().context("invalid configuration")?;
    let addr = config.bind_addr;

    // Connect to database
    let pool = database::connect(&config.database_url, config.max_connections)
        .await
        .context("failed to connect to database")?;
    database::migrate(&pool).await.context("failed to run migrations")?;

    let app = build_router(AppState::new(pool, config));

    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

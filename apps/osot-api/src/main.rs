use anyhow::Context;

use osot_api::api::routes::build_router;
use osot_api::config::AppConfig;
use osot_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let addr = config.bind_addr;

    let state = AppState::from_config(config);
    let app = build_router(state);

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

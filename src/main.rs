use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use garage_api::config::AppConfig;
use garage_api::database::connection::get_db_client;
use garage_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    tracing::info!("🔧 Running in {} mode", config.mode.as_str());

    let db = get_db_client(&config)
        .await
        .context("failed to connect to MongoDB")?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("HOST/PORT do not form a socket address")?;

    let app_state = AppState::from_config(db, config).context("failed to initialize services")?;
    tracing::info!("✅ OTP, messaging and token services initialized");

    let limiter = app_state.otp_limiter.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            limiter.prune();
            tracing::debug!("🧹 OTP limiter tracking {} keys", limiter.tracked_keys());
        }
    });

    let app = garage_api::build_router(app_state);
    start_server(app, addr).await
}

async fn start_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("🚀 Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

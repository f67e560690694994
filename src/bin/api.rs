use cashflow_os::{
    api::{start_server, ApiState},
    config::AppConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    info!("🚀 CashFlow OS - API Server");
    info!("📍 Port: {}", config.port);
    info!("💾 Data file: {}", config.data_path.display());
    info!("📊 Risk ladder: {:?}", config.risk_ladder);

    let state = ApiState::from_config(&config).await?;

    info!("✅ Store and advisor initialized");
    info!("📡 Starting API server...");

    start_server(state, config.port).await?;

    Ok(())
}

use tonic::transport::Endpoint;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod handlers;
mod models;
mod validation;

use config::GatewayConfig;
use handlers::{AppState, app};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = GatewayConfig::from_env()?;
    if config.admin_api_key.is_none() {
        info!("ADMIN_API_KEY not set; admin routes accept login tokens only");
    }

    let channel = Endpoint::from_shared(config.order_service_endpoint.clone())?
        .connect()
        .await?;
    info!(endpoint = %config.order_service_endpoint, "connected to order service");

    let state = AppState::new(channel, config.admin_api_key);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("API Gateway listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state)).await?;

    Ok(())
}

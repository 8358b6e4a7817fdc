use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::{AppState, config::AppSettings, routes};
use common::{
    jwt::{JwtConfig, JwtService},
    store::{self, StorageConfig},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting API service");

    let settings = AppSettings::load()?;

    // Initialize storage
    let storage_config = StorageConfig::from_env()?;
    let repositories = store::open(&storage_config).await?;

    // Initialize JWT service
    let jwt_service = JwtService::new(JwtConfig::from_env()?);

    let app_state = AppState::from_settings(repositories, jwt_service, &settings)?;

    info!("API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    info!("API service listening on {}", settings.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

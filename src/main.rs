use sea_orm::{ConnectOptions, Database};
use std::error::Error;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use storefront::api::{create_api_router, AppState};
use storefront::config::Settings;
use storefront::entities::setup_schema;
use storefront::integrations::{cloudinary::CloudinaryClient, google_sheets::GoogleSheetsClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let settings = Settings::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut options = ConnectOptions::new(settings.database_url.clone());
    options.sqlx_logging(false);
    let db = Database::connect(options).await?;
    setup_schema(&db).await?;

    let state = AppState {
        db: Arc::new(db),
        sheets: Arc::new(GoogleSheetsClient::new(settings.sheets.clone())),
        images: Arc::new(CloudinaryClient::new(settings.cloudinary.clone())),
        settings: Arc::new(settings),
    };
    let bind_addr = state.settings.bind_addr;
    let app = create_api_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

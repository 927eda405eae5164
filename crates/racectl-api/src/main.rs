mod config;
mod error;
mod routes;

use config::AppConfig;
use racectl_core::db::Database;
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("racectl_api=info".parse().expect("valid directive")),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting racectl-api with config: {:?}", config);

    let db = Database::open(&config.db_path)?;
    let state = AppState::new(db);
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("racectl-api listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}

//! Comanda API Server
//!
//! REST API server for the restaurant ordering backend.
//!
//! Author: hephaex@gmail.com

use comanda_api::state::AppState;
use comanda_api::{auth, create_router};
use comanda_core::config::AppConfig;
use comanda_core::PgUserStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "comanda_api=debug,tower_http=debug".into()),
        )
        .init();

    // Load configuration
    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Connect storage, bootstrap the schema, and seed roles and the
    // default staff accounts.
    let store = PgUserStore::connect(&config.database).await?;
    store.init_schema().await?;
    auth::seed::seed(&store, config.auth.seed_default_users).await?;

    // Create application state
    let state = Arc::new(AppState::new(config, Arc::new(store)));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Comanda API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

//! Eventline API Server
//!
//! REST API server for the Eventline event-management backend.

use eventline_api::auth::{InMemoryIdentityStore, LogMailer};
use eventline_api::{create_router, state::AppState};
use eventline_core::AppConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env().unwrap_or_default();

    // Initialize tracing; RUST_LOG overrides the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "eventline_api={level},tower_http={level}",
            level = config.logging.level
        )
        .into()
    });
    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    if !config.auth.is_production() {
        tracing::warn!("Running with development secrets; set JWT_SECRET in production");
    }

    // Wire collaborators. Production deployments replace these with
    // database-backed and SMTP-backed implementations.
    let store = Arc::new(InMemoryIdentityStore::new());
    let mailer = Arc::new(LogMailer);

    // Create application state
    let state = Arc::new(AppState::new(config, store, mailer));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Eventline API server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

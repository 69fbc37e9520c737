//! Production Management - Backend Server
//!
//! Runs the production pipeline, payroll and order engine behind a JSON API.

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use production_backend::{
    build_store, config::Config, create_app, services::UserService, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pm_server=debug,production_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Production Management Server");
    tracing::info!("Environment: {}", config.environment);

    let store = build_store(&config).await?;

    // Make sure somebody can log in on a fresh database
    let users = UserService::new(store.clone(), &config);
    if let Some(admin) = users.bootstrap_admin(&config.bootstrap).await? {
        tracing::info!("Created administrator '{}'", admin.username);
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(store, config);

    // Build application
    let app = create_app(state);

    // Start server
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Keystone - Real estate marketing site and content management

use anyhow::Result;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keystone::{
    api::{self, AppState},
    config::Config,
    db,
    services::Scheduler,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keystone=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Keystone...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Open storage (runs schema migrations for PostgreSQL)
    let repos = db::open_storage(&config.storage).await?;

    let state = AppState::new(repos, &config);

    // First run: make sure someone can log in
    if let Some(admin) = state.users.bootstrap_admin(&config.auth).await? {
        tracing::info!("Initial admin account: {}", admin.username);
    }

    if config.mail.is_enabled() {
        tracing::info!("Contact notifications enabled");
    } else {
        tracing::info!("SMTP not configured; contact notifications are only logged");
    }

    // Publish scheduled content
    Scheduler::new(state.blog.clone(), state.properties.clone())
        .spawn(config.scheduler.interval_seconds);

    // Start rate limiter cleanup task (runs every 5 minutes)
    {
        let limiter = Arc::clone(&state.rate_limiter);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

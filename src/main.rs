use std::sync::Arc;

use attendance_dashboard::api::router;
use attendance_dashboard::config::AppConfig;
use attendance_dashboard::persistence::{
    HttpRemoteStore, LocalStore, NoopRemoteStore, PersistenceAdapter, RemoteStore,
};
use attendance_dashboard::services::{Dashboard, Notifier};
use attendance_dashboard::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "attendance_dashboard=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;

    let local = LocalStore::connect(&config.database_url).await?;

    let remote: Arc<dyn RemoteStore> = match &config.remote {
        Some(remote) => {
            info!("Using remote store at {}", remote.base_url);
            Arc::new(HttpRemoteStore::new(remote.clone())?)
        }
        None => {
            warn!("REMOTE_API_URL is not set; data is kept locally only");
            Arc::new(NoopRemoteStore)
        }
    };

    let persistence = PersistenceAdapter::new(local.clone(), remote);
    let dashboard = Dashboard::load(persistence, Notifier::new(), config.seed_defaults).await?;
    info!(
        "Loaded {} labs and {} classes from {:?} store",
        dashboard.store().labs().len(),
        dashboard.store().classes().len(),
        dashboard.source()
    );

    let state = AppState::new(dashboard, local);
    let app = router(state.clone());

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Waiting for pending remote sync");
    state.dashboard.lock().await.flush_remote().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}

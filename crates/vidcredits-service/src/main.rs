//! vidcredits service - HTTP API for the video credit ledger
//!
//! This is the main entry point for the vidcredits service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidcredits_service::{
    create_router, recover_orphaned_jobs, AppState, ServiceConfig, StorageBackend,
};
use vidcredits_store::{MemoryStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vidcredits=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting vidcredits service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        storage_backend = ?config.storage_backend,
        data_dir = %config.data_dir,
        stripe_configured = %config.stripe_api_key.is_some(),
        generation_configured = %config.generation_api_url.is_some(),
        "Service configuration loaded"
    );

    let store = open_store(&config)?;

    let recovered = recover_orphaned_jobs(store.as_ref())?;
    if recovered > 0 {
        tracing::warn!(recovered = %recovered, "Refunded video jobs orphaned by a restart");
    }

    let state = AppState::new(store, config.clone());
    tracing::info!(
        payments = %state.has_stripe(),
        generation = %state.has_generator(),
        "Integrations initialized"
    );

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "rocksdb-backend")]
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match config.storage_backend {
        StorageBackend::Rocks => {
            tracing::info!(path = %config.data_dir, "Opening RocksDB store");
            Ok(Arc::new(vidcredits_store::RocksStore::open(&config.data_dir)?))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store - data will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    if config.storage_backend == StorageBackend::Rocks {
        tracing::warn!("Built without RocksDB support - falling back to in-memory store");
    }
    Ok(Arc::new(MemoryStore::new()))
}

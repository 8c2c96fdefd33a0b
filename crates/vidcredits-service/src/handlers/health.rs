//! Health check handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the ledger cannot be read.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Ledger backend (`rocksdb` or `memory`).
    pub storage: String,
    /// Whether Stripe checkout is configured.
    pub payments: bool,
    /// Whether a generation provider is configured.
    pub generation: bool,
    /// Jobs currently holding reserved credits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generating_jobs: Option<usize>,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let generating_jobs = match state.store.generating_video_jobs() {
        Ok(jobs) => Some(jobs.len()),
        Err(e) => {
            tracing::error!(error = %e, "Health check could not read the ledger");
            None
        }
    };

    Json(HealthResponse {
        status: if generating_jobs.is_some() { "ok" } else { "degraded" }.to_string(),
        service: "vidcredits".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.config.storage_backend.as_str().to_string(),
        payments: state.has_stripe(),
        generation: state.has_generator(),
        generating_jobs,
    })
}

//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, credits, health, payments, videos, webhooks};
use crate::state::AppState;

/// Maximum concurrent generation requests.
///
/// Each one holds a provider call open for up to the generation timeout.
const GENERATION_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/credits/packages` - Package catalog and duration tiers
///
/// ## Auth
/// - `POST /v1/auth/register` - Create an account with the welcome bonus
/// - `POST /v1/auth/login` - Exchange credentials for a token
/// - `GET /v1/auth/me` - Current user (JWT)
///
/// ## Credits (JWT)
/// - `GET /v1/credits/balance` - Current balance
/// - `GET /v1/credits/transactions` - Transaction history
///
/// ## Payments (JWT)
/// - `POST /v1/payments/checkout` - Start a Stripe checkout
/// - `POST /v1/payments/confirm` - Credit a paid checkout
///
/// ## Videos (JWT)
/// - `POST /v1/videos/generate` - Generate a video (rate-limited)
/// - `GET /v1/videos` - List jobs
/// - `GET /v1/videos/{id}` - Get one job
///
/// ## Webhooks (Signature verification)
/// - `POST /webhooks/stripe` - Stripe webhooks
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Auth
        .route("/auth/register", post(accounts::register))
        .route("/auth/login", post(accounts::login))
        .route("/auth/me", get(accounts::me))
        // Credits
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/transactions", get(credits::list_transactions))
        .route("/credits/packages", get(credits::list_packages))
        // Payments
        .route("/payments/checkout", post(payments::create_checkout))
        .route("/payments/confirm", post(payments::confirm_payment))
        // Videos
        .route(
            "/videos/generate",
            post(videos::generate)
                .layer(ConcurrencyLimitLayer::new(GENERATION_MAX_CONCURRENT_REQUESTS)),
        )
        .route("/videos", get(videos::list_videos))
        .route("/videos/:id", get(videos::get_video))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by Stripe)
        .route("/webhooks/stripe", post(webhooks::stripe_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

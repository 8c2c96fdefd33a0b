//! vidcredits HTTP API service.
//!
//! This crate exposes the credit ledger over HTTP:
//!
//! - Accounts with a welcome bonus
//! - Credit balance, history and the package catalog
//! - Stripe Checkout purchases, confirmed by the client or by webhook
//! - Credit-metered video generation with refunds on failure
//!
//! # Authentication
//!
//! Users log in with email and password and receive an HS256 JWT, sent as
//! `Authorization: Bearer <token>`. Stripe webhooks are authenticated by
//! their `Stripe-Signature` header.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Catalog handler needs async for the router

pub mod auth;
pub mod config;
pub mod consumption;
pub mod crypto;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod purchase;
pub mod routes;
pub mod state;
pub mod stripe;

pub use config::{ServiceConfig, StorageBackend};
pub use consumption::recover_orphaned_jobs;
pub use error::ApiError;
pub use generation::{GenerationClient, GenerationError};
pub use routes::create_router;
pub use state::AppState;
pub use stripe::{StripeClient, StripeError};

//! Checkout handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::purchase::{confirm_checkout, initiate_checkout};
use crate::state::AppState;

/// Checkout request.
///
/// `credits` and `amount` must match the catalog entry for `package_id`.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Catalog package id.
    #[serde(default, alias = "packageId")]
    pub package_id: Option<String>,
    /// Credits the client expects to receive.
    #[serde(default)]
    pub credits: Option<i64>,
    /// Price in USD the client displayed.
    #[serde(default, alias = "price")]
    pub amount: Option<f64>,
}

/// Checkout response.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Stripe checkout session ID.
    pub session_id: String,
    /// URL to redirect the user to.
    pub checkout_url: Option<String>,
    /// Package being purchased.
    pub package_id: String,
    /// Credits granted once paid.
    pub credits: i64,
}

/// Start a Stripe checkout for a credit package.
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let (package, session) = initiate_checkout(
        &state,
        &auth.user_id,
        body.package_id.as_deref(),
        body.credits,
        body.amount,
    )
    .await?;

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        checkout_url: session.url,
        package_id: package.id,
        credits: package.credits,
    }))
}

/// Confirm request.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    /// Stripe checkout session ID.
    #[serde(alias = "sessionId")]
    pub session_id: String,
}

/// Confirm response.
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    /// Always true on a 200.
    pub success: bool,
    /// Credits granted by the session.
    pub credits_added: i64,
    /// Balance after this call.
    pub new_balance: i64,
    /// True when an earlier call already credited the session.
    pub already_processed: bool,
    /// The purchase transaction.
    pub transaction_id: String,
}

/// Confirm a paid checkout session and credit the purchase.
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let session_id = body.session_id.trim();
    if session_id.is_empty() {
        return Err(ApiError::BadRequest("session_id is required".into()));
    }

    let outcome = confirm_checkout(&state, session_id, Some(&auth.user_id)).await?;

    let new_balance = if outcome.already_processed {
        state.store.balance_of(&auth.user_id)?
    } else {
        outcome.transaction.balance_after
    };

    Ok(Json(ConfirmResponse {
        success: true,
        credits_added: outcome.transaction.amount,
        new_balance,
        already_processed: outcome.already_processed,
        transaction_id: outcome.transaction.id.to_string(),
    }))
}

//! Stripe webhook handler.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::purchase::confirm_checkout;
use crate::state::AppState;
use crate::stripe::WebhookEvent;

/// Checkout finished; card payments are already paid.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Delayed payment method (bank debit, voucher) cleared after checkout.
pub const CHECKOUT_ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
}

/// Handle Stripe webhooks.
///
/// Both checkout events run the same confirmation as the client endpoint, so
/// whichever arrives second is a no-op. A session that is not paid yet is
/// acknowledged without crediting; Stripe sends the async success event once
/// the funds clear.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let stripe = state
        .stripe
        .as_deref()
        .ok_or_else(|| ApiError::ExternalService("Stripe not configured".into()))?;

    if stripe.verifies_webhooks() {
        let signature = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing Stripe signature".into()))?;

        stripe
            .verify_webhook_signature(&body, signature)
            .map_err(|e| {
                tracing::warn!(error = %e, "Invalid Stripe webhook signature");
                ApiError::BadRequest("Invalid webhook signature".into())
            })?;
    } else {
        tracing::warn!("Stripe webhook_secret not configured - skipping signature verification");
    }

    let event: WebhookEvent =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event_type = %event.event_type,
        event_id = %event.id,
        "Received Stripe webhook"
    );

    if matches!(
        event.event_type.as_str(),
        CHECKOUT_COMPLETED | CHECKOUT_ASYNC_PAYMENT_SUCCEEDED
    ) {
        let session_id = event
            .data
            .object
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ApiError::BadRequest("Missing checkout session id".into()))?;

        match confirm_checkout(&state, session_id, None).await {
            Ok(outcome) => tracing::info!(
                event_id = %event.id,
                session_id = %session_id,
                already_processed = %outcome.already_processed,
                "Checkout completion handled"
            ),
            Err(ApiError::Validation {
                code: "payment_not_completed",
                ..
            }) => {
                tracing::info!(
                    event_id = %event.id,
                    session_id = %session_id,
                    "Checkout session not paid yet - awaiting async payment"
                );
            }
            Err(e) => return Err(e),
        }
    } else {
        tracing::debug!(event_type = %event.event_type, "Unhandled Stripe event");
    }

    Ok(Json(WebhookResponse { received: true }))
}

//! Credit purchases through Stripe Checkout.
//!
//! Initiating a purchase never touches the ledger. Confirmation always
//! re-fetches the session from Stripe and credits the ledger once per session
//! id; the `payment_refs` index turns repeats into no-ops.

use vidcredits_core::{CreditPackage, CreditTransaction, LedgerError, TransactionKind, UserId};
use vidcredits_store::StoreError;

use crate::error::ApiError;
use crate::state::AppState;
use crate::stripe::{CheckoutSession, CheckoutUrls, StripeClient, StripeError};

/// Result of confirming a checkout session.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    /// The purchase entry for the session.
    pub transaction: CreditTransaction,
    /// True when the session had already been credited.
    pub already_processed: bool,
}

fn stripe_client(state: &AppState) -> Result<&StripeClient, ApiError> {
    state
        .stripe
        .as_deref()
        .ok_or_else(|| ApiError::ExternalService("Stripe not configured".into()))
}

fn stripe_failure(e: &StripeError) -> ApiError {
    tracing::error!(error = %e, "Stripe request failed");
    ApiError::ExternalService(format!("Payment provider error: {e}"))
}

/// Start a checkout for a catalog package.
///
/// The requested credits and price must match the catalog entry exactly.
pub async fn initiate_checkout(
    state: &AppState,
    user_id: &UserId,
    package_id: Option<&str>,
    credits: Option<i64>,
    price_usd: Option<f64>,
) -> Result<(CreditPackage, CheckoutSession), ApiError> {
    let package = state
        .config
        .pricing
        .resolve_purchase(package_id, credits, price_usd)?
        .clone();

    let stripe = stripe_client(state)?;

    let user = state
        .store
        .get_user(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let urls = CheckoutUrls::for_frontend(&state.config.frontend_url);
    let session = stripe
        .create_checkout_session(&user, &package, &urls)
        .await
        .map_err(|e| stripe_failure(&e))?;

    tracing::info!(
        user_id = %user_id,
        package_id = %package.id,
        session_id = %session.id,
        "Checkout session created"
    );

    Ok((package, session))
}

/// Confirm a checkout session and credit the purchase exactly once.
///
/// When `caller` is set the session must have been created for that user.
pub async fn confirm_checkout(
    state: &AppState,
    session_id: &str,
    caller: Option<&UserId>,
) -> Result<PurchaseOutcome, ApiError> {
    let stripe = stripe_client(state)?;
    let session = stripe
        .get_checkout_session(session_id)
        .await
        .map_err(|e| stripe_failure(&e))?;

    let user_id = session
        .metadata
        .user_id
        .as_deref()
        .or(session.client_reference_id.as_deref())
        .and_then(|id| id.parse::<UserId>().ok())
        .ok_or_else(|| ApiError::BadRequest("Checkout session has no user".into()))?;

    if caller.is_some_and(|caller| *caller != user_id) {
        tracing::warn!(session_id = %session_id, "Checkout session confirmed by another user");
        return Err(ApiError::NotFound("Checkout session not found".into()));
    }

    if !session.is_paid() {
        return Err(LedgerError::PaymentNotCompleted {
            session_id: session.id.clone(),
            status: session
                .payment_status
                .clone()
                .unwrap_or_else(|| "unknown".into()),
        }
        .into());
    }

    let credits = session
        .metadata
        .credits
        .as_deref()
        .and_then(|c| c.trim().parse::<i64>().ok())
        .filter(|c| *c > 0)
        .ok_or_else(|| ApiError::BadRequest("Checkout session has no credit amount".into()))?;

    let package_name = session
        .metadata
        .package_id
        .as_deref()
        .map(|id| {
            state
                .config
                .pricing
                .package(id)
                .map_or_else(|| id.to_string(), |p| p.name.clone())
        })
        .unwrap_or_else(|| "credit".into());

    let description = format!("Credit purchase - {package_name} package");

    match state.store.credit(
        &user_id,
        credits,
        TransactionKind::Purchase,
        &description,
        Some(&session.id),
    ) {
        Ok(transaction) => {
            tracing::info!(
                user_id = %user_id,
                session_id = %session.id,
                credits = %credits,
                balance = %transaction.balance_after,
                "Purchase credited"
            );
            Ok(PurchaseOutcome {
                transaction,
                already_processed: false,
            })
        }
        Err(StoreError::DuplicateExternalRef { existing, .. }) => {
            tracing::info!(session_id = %session.id, "Checkout session already processed");
            Ok(PurchaseOutcome {
                transaction: *existing,
                already_processed: true,
            })
        }
        Err(e) => Err(e.into()),
    }
}

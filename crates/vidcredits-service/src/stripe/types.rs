//! Stripe API types.

use serde::Deserialize;

/// Payment status Stripe reports once a checkout has been paid.
pub const PAYMENT_STATUS_PAID: &str = "paid";

/// Stripe Checkout session object.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session ID.
    pub id: String,
    /// Checkout URL to redirect the user to.
    #[serde(default)]
    pub url: Option<String>,
    /// Payment status (`paid`, `unpaid`, `no_payment_required`).
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Session status.
    #[serde(default)]
    pub status: Option<String>,
    /// Total amount in cents.
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// Client reference ID (our `user_id`).
    #[serde(default)]
    pub client_reference_id: Option<String>,
    /// Metadata written when the session was created.
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

impl CheckoutSession {
    /// Whether Stripe has marked the session as paid.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some(PAYMENT_STATUS_PAID)
    }
}

/// Purchase metadata attached to a checkout session.
///
/// Stripe returns metadata values as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutMetadata {
    /// Purchasing user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Catalog package id.
    #[serde(default)]
    pub package_id: Option<String>,
    /// Credits to grant.
    #[serde(default)]
    pub credits: Option<String>,
}

/// Stripe webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event ID.
    pub id: String,
    /// Event type (e.g., "checkout.session.completed").
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: WebhookEventData,
}

/// Webhook event data container.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    /// The event object.
    pub object: serde_json::Value,
}

/// Stripe API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    /// Error details.
    pub error: StripeErrorDetail,
}

/// Stripe error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message.
    #[serde(default)]
    pub message: String,
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_parses_with_sparse_fields() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_1",
            "payment_status": "paid",
            "metadata": { "user_id": "u", "package_id": "pro", "credits": "50" }
        }))
        .unwrap();

        assert!(session.is_paid());
        assert_eq!(session.metadata.credits.as_deref(), Some("50"));
        assert!(session.url.is_none());
    }

    #[test]
    fn unpaid_session_is_not_paid() {
        let session: CheckoutSession =
            serde_json::from_value(serde_json::json!({ "id": "cs", "payment_status": "unpaid" }))
                .unwrap();
        assert!(!session.is_paid());
        assert!(session.metadata.user_id.is_none());
    }
}

//! Stripe API client implementation.

use reqwest::Client;
use std::time::Duration;

use vidcredits_core::{CreditPackage, User};

use super::types::{CheckoutSession, StripeErrorResponse};
use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {error_type} - {message}")]
    Api {
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Invalid webhook signature.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Redirect targets for a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    /// Where Stripe sends the user after paying.
    pub success_url: String,
    /// Where Stripe sends the user after cancelling.
    pub cancel_url: String,
}

impl CheckoutUrls {
    /// Build the storefront redirect URLs under `frontend_url`.
    #[must_use]
    pub fn for_frontend(frontend_url: &str) -> Self {
        let base = frontend_url.trim_end_matches('/');
        Self {
            success_url: format!("{base}?payment=success&session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{base}?payment=cancelled"),
        }
    }
}

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    webhook_secret: Option<String>,
    base_url: String,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    /// * `webhook_secret` - Optional webhook signing secret (whsec_...)
    /// * `base_url` - API base, normally `https://api.stripe.com/v1`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        webhook_secret: Option<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, StripeError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            webhook_secret,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Whether incoming webhooks must carry a valid signature.
    #[must_use]
    pub fn verifies_webhooks(&self) -> bool {
        self.webhook_secret.is_some()
    }

    /// Create a Checkout session for purchasing a credit package.
    pub async fn create_checkout_session(
        &self,
        user: &User,
        package: &CreditPackage,
        urls: &CheckoutUrls,
    ) -> Result<CheckoutSession, StripeError> {
        let user_id = user.id;
        let params = vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("success_url", urls.success_url.clone()),
            ("cancel_url", urls.cancel_url.clone()),
            ("client_reference_id", user_id.to_string()),
            ("customer_email", user.email.clone()),
            ("line_items[0][price_data][currency]", "usd".to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                format!("SKV Global Credits - {} Package", package.name),
            ),
            (
                "line_items[0][price_data][product_data][description]",
                format!("{} credits for AI video generation", package.credits),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                package.price_cents.to_string(),
            ),
            ("line_items[0][quantity]", "1".to_string()),
            ("metadata[user_id]", user_id.to_string()),
            ("metadata[package_id]", package.id.clone()),
            ("metadata[credits]", package.credits.to_string()),
        ];

        tracing::debug!(
            user_id = %user_id,
            package_id = %package.id,
            amount_cents = %package.price_cents,
            "Creating Stripe checkout session"
        );

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .form(&params)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Retrieve a Checkout session by ID.
    pub async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .client
            .get(format!("{}/checkout/sessions/{}", self.base_url, session_id))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Verify a webhook signature.
    ///
    /// # Arguments
    ///
    /// * `payload` - Raw request body
    /// * `signature` - Value of the `Stripe-Signature` header
    pub fn verify_webhook_signature(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<(), StripeError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or_else(|| StripeError::Configuration("Webhook secret not configured".into()))?;

        // Format: t=timestamp,v1=signature,v1=signature2,...
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            match part.trim().split_once('=') {
                Some(("t", ts)) => timestamp = Some(ts),
                Some(("v1", sig)) => signatures.push(sig),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(StripeError::InvalidSignature)?;
        if signatures.is_empty() {
            return Err(StripeError::InvalidSignature);
        }

        let expected = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"));

        if signatures.iter().any(|sig| constant_time_eq(&expected, sig)) {
            Ok(())
        } else {
            Err(StripeError::InvalidSignature)
        }
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        match response.json::<StripeErrorResponse>().await {
            Ok(stripe_error) => Err(StripeError::Api {
                error_type: stripe_error.error.error_type,
                message: stripe_error.error.message,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
                code: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(secret: Option<&str>) -> StripeClient {
        StripeClient::new("sk_test_xxx", secret.map(String::from), "https://api.stripe.com/v1/")
            .unwrap()
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(client(None).base_url, "https://api.stripe.com/v1");
    }

    #[test]
    fn checkout_urls_follow_storefront_layout() {
        let urls = CheckoutUrls::for_frontend("https://app.example.com/");
        assert_eq!(
            urls.success_url,
            "https://app.example.com?payment=success&session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(urls.cancel_url, "https://app.example.com?payment=cancelled");
    }

    #[test]
    fn webhook_signature_roundtrip() {
        let stripe = client(Some("whsec_test"));
        let payload = r#"{"id":"evt_1"}"#;
        let sig = hmac_sha256_hex("whsec_test", &format!("1700000000.{payload}"));

        let header = format!("t=1700000000,v1=deadbeef,v1={sig}");
        assert!(stripe.verify_webhook_signature(payload, &header).is_ok());
        assert!(matches!(
            stripe.verify_webhook_signature(payload, "t=1700000000,v1=deadbeef"),
            Err(StripeError::InvalidSignature)
        ));
        assert!(matches!(
            stripe.verify_webhook_signature(payload, &format!("v1={sig}")),
            Err(StripeError::InvalidSignature)
        ));
    }

    #[test]
    fn verification_requires_secret() {
        assert!(!client(None).verifies_webhooks());
        assert!(matches!(
            client(None).verify_webhook_signature("{}", "t=1,v1=00"),
            Err(StripeError::Configuration(_))
        ));
    }
}

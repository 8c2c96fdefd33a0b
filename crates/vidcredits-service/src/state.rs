//! Application state.

use std::sync::Arc;
use std::time::Duration;

use vidcredits_store::Store;

use crate::config::ServiceConfig;
use crate::generation::GenerationClient;
use crate::stripe::StripeClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Stripe client for payments (optional).
    pub stripe: Option<Arc<StripeClient>>,

    /// Video generation provider client (optional).
    pub generator: Option<Arc<GenerationClient>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        // Create Stripe client if configured
        let stripe = config.stripe_api_key.as_ref().and_then(|key| {
            match StripeClient::new(
                key,
                config.stripe_webhook_secret.clone(),
                &config.stripe_api_base,
            ) {
                Ok(client) => {
                    tracing::info!("Stripe integration enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create Stripe client");
                    None
                }
            }
        });

        if stripe.is_none() {
            tracing::warn!("Stripe not configured - payments will not be available");
        }

        // Create generation client if configured
        let generator = config
            .generation_api_url
            .as_ref()
            .zip(config.generation_api_key.as_ref())
            .and_then(|(url, key)| {
                match GenerationClient::new(
                    url,
                    key,
                    &config.generation_model,
                    config.generation_customer_id.clone(),
                    Duration::from_secs(config.generation_timeout_seconds),
                ) {
                    Ok(client) => {
                        tracing::info!(generation_url = %url, "Video generation enabled");
                        Some(Arc::new(client))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to create generation client");
                        None
                    }
                }
            });

        if generator.is_none() {
            tracing::warn!("Generation provider not configured - video requests will fail");
        }

        Self {
            store,
            config,
            stripe,
            generator,
        }
    }

    /// Check if Stripe is configured.
    #[must_use]
    pub fn has_stripe(&self) -> bool {
        self.stripe.is_some()
    }

    /// Check if the generation provider is configured.
    #[must_use]
    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }
}
